use serde::Serialize;

use crate::content::summary::{body_read_time, format_timestamp, read_time_label};
use crate::content::widget::{ContentWidget, EditorJsFactory, WidgetError, WidgetMode, WidgetMount, WidgetSlot};
use crate::content::{render_body, PostBody};
use crate::models::{avatar_url, Post, Tally};
use crate::permissions::{Action, Gate};

use super::listing::PostCard;

pub const SIDEBAR_POSTS: usize = 2;

#[derive(Debug, Serialize)]
pub struct ReaderView {
    pub id: String,
    pub title: String,
    pub category: String,
    pub author: String,
    pub author_id: Option<String>,
    pub author_avatar: String,
    pub date: String,
    pub read_time: String,
    pub image: Option<String>,
    pub views: u64,
    pub tally: Tally,
    pub liked: bool,
    pub disliked: bool,
    /// Server-rendered body, shown until the widget mounts.
    pub fallback_html: String,
    /// Mount descriptor for the read-only widget, absent for bodies that are
    /// not block documents.
    pub widget: Option<String>,
    pub can_edit: bool,
    pub can_react: bool,
    pub others: Vec<PostCard>,
}

impl ReaderView {
    pub fn build(post: &Post, all_posts: &[Post], gate: &Gate<'_>, widget: Option<String>) -> Self {
        let author_name = post
            .author
            .as_ref()
            .and_then(|a| a.username())
            .unwrap_or("Unknown")
            .to_string();
        let author_image = match &post.author {
            Some(crate::models::UserRef::Populated(u)) => u.profile_image.as_deref(),
            _ => None,
        };
        let viewer_id = gate.caller().map(|u| u.id.as_str());
        Self {
            id: post.id.clone(),
            title: post.title.clone(),
            category: post.category.clone(),
            author_avatar: avatar_url(author_image, &author_name),
            author: author_name,
            author_id: post.author.as_ref().map(|a| a.id().to_string()),
            date: post.created_at.as_ref().map(format_timestamp).unwrap_or_default(),
            read_time: read_time_label(body_read_time(&post.content)),
            image: post.featured_image.clone(),
            views: post.views,
            tally: post.tally(),
            liked: viewer_id.map_or(false, |id| post.likes.iter().any(|l| l == id)),
            disliked: viewer_id.map_or(false, |id| post.dislikes.iter().any(|d| d == id)),
            fallback_html: render_body(&post.content),
            widget,
            can_edit: gate.allows(Action::EditPost),
            can_react: gate.allows(Action::React),
            others: all_posts
                .iter()
                .filter(|p| p.id != post.id)
                .take(SIDEBAR_POSTS)
                .map(PostCard::from_post)
                .collect(),
        }
    }
}

/// Mount the read-only widget for `post` and return its descriptor JSON.
/// The widget is ready before the document is handed to it.
pub async fn mount_reader(
    slot: &mut WidgetSlot<EditorJsFactory>,
    post: &Post,
) -> Result<Option<String>, WidgetError> {
    let PostBody::Document(doc) = &post.content else {
        slot.release();
        return Ok(None);
    };
    let widget = slot.acquire(WidgetMount::new(post.id.clone(), WidgetMode::ReadOnly))?;
    widget.ready().await?;
    widget.render(doc).await?;
    Ok(Some(widget.descriptor().to_script_json()))
}
