use serde::Serialize;

use crate::content::summary::format_timestamp;
use crate::error::ValidationError;
use crate::models::{Comment, User};
use crate::permissions::{Action, Gate};

pub const MAX_COMMENT_CHARS: usize = 100;

/// Trimmed comment text, or the reason it cannot be posted.
pub fn validate_comment(raw: &str) -> Result<String, ValidationError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyComment);
    }
    if text.chars().count() > MAX_COMMENT_CHARS {
        return Err(ValidationError::CommentTooLong(MAX_COMMENT_CHARS));
    }
    Ok(text.to_string())
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentRow {
    pub id: String,
    pub author_id: String,
    pub username: String,
    pub avatar: String,
    pub text: String,
    pub date: String,
    pub likes: usize,
    pub dislikes: usize,
    pub liked: bool,
    pub disliked: bool,
    pub author_blocked: bool,
    pub can_delete: bool,
}

/// The comment thread under a post.
#[derive(Debug, Clone, Serialize)]
pub struct CommentSection {
    pub post_id: String,
    pub comments: Vec<CommentRow>,
    pub can_post: bool,
    pub can_react: bool,
    pub signed_in: bool,
    pub viewer_blocked: bool,
    pub max_chars: usize,
    /// Set when the thread could not be loaded.
    pub error: Option<String>,
}

impl CommentSection {
    pub fn build(post_id: &str, comments: &[Comment], gate: &Gate<'_>) -> Self {
        let viewer: Option<&User> = gate.caller();
        let rows = comments
            .iter()
            .map(|c| {
                let viewer_id = viewer.map(|u| u.id.as_str());
                CommentRow {
                    id: c.id.clone(),
                    author_id: c.author_id().to_string(),
                    username: if c.username.is_empty() {
                        c.user_id.username().unwrap_or("Anonymous").to_string()
                    } else {
                        c.username.clone()
                    },
                    avatar: c.avatar_url(),
                    text: c.text.clone(),
                    date: c.created_at.as_ref().map(format_timestamp).unwrap_or_default(),
                    likes: c.likes.len(),
                    dislikes: c.dislikes.len(),
                    liked: viewer_id.map_or(false, |id| c.likes.iter().any(|l| l == id)),
                    disliked: viewer_id.map_or(false, |id| c.dislikes.iter().any(|d| d == id)),
                    author_blocked: c.blocked,
                    can_delete: gate.allows(Action::DeleteComment(c)),
                }
            })
            .collect();
        Self {
            post_id: post_id.to_string(),
            comments: rows,
            can_post: gate.allows(Action::PostComment),
            can_react: gate.allows(Action::React),
            signed_in: viewer.is_some(),
            viewer_blocked: viewer.map_or(false, |u| u.blocked),
            max_chars: MAX_COMMENT_CHARS,
            error: None,
        }
    }

    pub fn unavailable(post_id: &str, gate: &Gate<'_>, message: String) -> Self {
        let mut section = Self::build(post_id, &[], gate);
        section.error = Some(message);
        section
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, UserRef};
    use crate::permissions::MainAdminId;

    fn user(id: &str, role: Role, blocked: bool) -> User {
        User {
            id: id.into(),
            username: id.into(),
            email: String::new(),
            role,
            blocked,
            profile_image: None,
            created_at: None,
        }
    }

    fn comment(id: &str, author: &str) -> Comment {
        Comment {
            id: id.into(),
            post_id: Some("p1".into()),
            post_title: None,
            user_id: UserRef::Id(author.into()),
            username: author.into(),
            profile_image: None,
            text: "nice".into(),
            likes: vec!["u1".into()],
            dislikes: vec![],
            created_at: None,
            blocked: false,
        }
    }

    #[test]
    fn comment_text_is_trimmed_and_bounded() {
        assert_eq!(validate_comment("  hello  "), Ok("hello".to_string()));
        assert_eq!(validate_comment("   "), Err(ValidationError::EmptyComment));
        assert!(validate_comment(&"x".repeat(100)).is_ok());
        assert_eq!(
            validate_comment(&"x".repeat(101)),
            Err(ValidationError::CommentTooLong(MAX_COMMENT_CHARS))
        );
    }

    #[test]
    fn only_own_comments_are_deletable_for_users() {
        let main = MainAdminId::new(Some("root".into()));
        let viewer = user("u1", Role::User, false);
        let gate = Gate::new(Some(&viewer), &main);
        let section = CommentSection::build("p1", &[comment("c1", "u1"), comment("c2", "u2")], &gate);
        assert!(section.comments[0].can_delete);
        assert!(!section.comments[1].can_delete);
        assert!(section.comments[0].liked);
        assert!(section.can_post);
    }

    #[test]
    fn blocked_viewer_cannot_post() {
        let main = MainAdminId::default();
        let viewer = user("u1", Role::User, true);
        let gate = Gate::new(Some(&viewer), &main);
        let section = CommentSection::build("p1", &[], &gate);
        assert!(!section.can_post);
        assert!(section.viewer_blocked);
    }

    #[test]
    fn anonymous_viewer_reads_only() {
        let main = MainAdminId::default();
        let gate = Gate::new(None, &main);
        let section = CommentSection::build("p1", &[comment("c1", "u2")], &gate);
        assert!(!section.can_post && !section.can_react && !section.signed_in);
        assert!(!section.comments[0].can_delete);
    }
}
