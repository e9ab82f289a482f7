//! Admin console: dashboard tabs, account pages and moderation actions.
//!
//! Every mutation is sent to the backend as-is and the page is then loaded
//! again from scratch, so what the admin sees is always the backend's state.

use serde::Serialize;
use tracing::{info, warn};

use crate::api::BackendClient;
use crate::content::summary::{body_excerpt, format_timestamp};
use crate::error::ApiError;
use crate::models::{Comment, Post, Role, User};
use crate::permissions::{admin_count, AccountStatus, Action, Gate, MainAdminId, RoleChange, MAX_ADMINS};
use crate::session::Session;

use super::account::ProfileView;
use super::scope::ViewScope;

pub const ADMIN_EXCERPT_CHARS: usize = 100;
pub const JUNIOR_NOTICE: &str =
    "You can block/unblock users, but only the main admin can edit roles, promote/demote users, or delete accounts.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminTab {
    #[default]
    Stats,
    Users,
    Posts,
    Comments,
    Account,
}

impl AdminTab {
    pub const ALL: [AdminTab; 5] =
        [AdminTab::Stats, AdminTab::Users, AdminTab::Posts, AdminTab::Comments, AdminTab::Account];

    /// Unknown names fall back to the dashboard.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.unwrap_or_default() {
            "users" => AdminTab::Users,
            "posts" => AdminTab::Posts,
            "comments" => AdminTab::Comments,
            "account" => AdminTab::Account,
            _ => AdminTab::Stats,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdminTab::Stats => "stats",
            AdminTab::Users => "users",
            AdminTab::Posts => "posts",
            AdminTab::Comments => "comments",
            AdminTab::Account => "account",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AdminTab::Stats => "Dashboard",
            AdminTab::Users => "Users",
            AdminTab::Posts => "Posts",
            AdminTab::Comments => "Comments",
            AdminTab::Account => "My Account",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TabLink {
    pub id: &'static str,
    pub label: &'static str,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct AdminStats {
    pub total_users: usize,
    pub total_posts: usize,
    pub total_comments: usize,
    pub total_views: u64,
}

/// Dashboard counters. A count whose request fails shows as zero.
pub async fn load_stats(api: &BackendClient, session: &Session) -> AdminStats {
    let (users, posts, comments) = futures_util::join!(
        api.all_accounts(session),
        api.list_posts(session),
        api.all_comments(session)
    );
    let mut stats = AdminStats::default();
    match users {
        Ok(users) => stats.total_users = users.len(),
        Err(e) => warn!(error = %e, "user count unavailable"),
    }
    match posts {
        Ok(posts) => {
            stats.total_posts = posts.len();
            stats.total_views = posts.iter().map(|p| p.views).sum();
        }
        Err(e) => warn!(error = %e, "post count unavailable"),
    }
    match comments {
        Ok(comments) => stats.total_comments = comments.len(),
        Err(e) => warn!(error = %e, "comment count unavailable"),
    }
    stats
}

#[derive(Debug, Serialize)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub avatar: String,
    pub role: &'static str,
    pub admin_ordinal: Option<usize>,
    pub status: &'static str,
    pub blocked: bool,
    pub toggle_verb: &'static str,
    pub joined: String,
    pub can_toggle_block: bool,
    pub can_promote: bool,
    pub can_demote: bool,
    pub can_delete: bool,
}

#[derive(Debug, Serialize)]
pub struct UsersPanel {
    pub rows: Vec<UserRow>,
    pub total: usize,
    pub admin_count: usize,
    pub max_admins: usize,
    pub limit_reached: bool,
    pub query: String,
}

impl UsersPanel {
    pub fn build(users: &[User], gate: &Gate<'_>, query: &str) -> Self {
        let count = admin_count(users);
        let gate = gate.with_admin_count(count);
        let needle = query.trim().to_lowercase();
        let admins: Vec<&str> = users.iter().filter(|u| u.is_admin()).map(|u| u.id.as_str()).collect();
        let rows = users
            .iter()
            .filter(|u| {
                needle.is_empty()
                    || u.username.to_lowercase().contains(&needle)
                    || u.email.to_lowercase().contains(&needle)
            })
            .map(|u| {
                let status = AccountStatus::of(u);
                let change = RoleChange::for_role(u.role);
                UserRow {
                    id: u.id.clone(),
                    username: u.username.clone(),
                    email: u.email.clone(),
                    avatar: u.avatar_url(),
                    role: u.role.as_str(),
                    admin_ordinal: admins.iter().position(|id| *id == u.id).map(|i| i + 1),
                    status: status.label(),
                    blocked: u.blocked,
                    toggle_verb: status.toggle_verb(),
                    joined: u.created_at.as_ref().map(format_timestamp).unwrap_or_default(),
                    can_toggle_block: gate.allows(Action::ToggleBlock),
                    can_promote: change == RoleChange::Promote && gate.allows(Action::ChangeRole(change)),
                    can_demote: change == RoleChange::Demote && gate.allows(Action::ChangeRole(change)),
                    can_delete: gate.allows(Action::DeleteUser),
                }
            })
            .collect();
        Self {
            rows,
            total: users.len(),
            admin_count: count,
            max_admins: MAX_ADMINS,
            limit_reached: gate.admin_limit_reached(),
            query: query.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostRow {
    pub id: String,
    pub title: String,
    pub category: String,
    pub excerpt: String,
    pub author: String,
    pub date: String,
    pub likes: u64,
    pub image: Option<String>,
    pub can_edit: bool,
    pub can_delete: bool,
}

#[derive(Debug, Serialize)]
pub struct PostsPanel {
    pub rows: Vec<PostRow>,
    pub query: String,
}

impl PostsPanel {
    pub fn build(posts: &[Post], gate: &Gate<'_>, query: &str) -> Self {
        let needle = query.trim().to_lowercase();
        let rows = posts
            .iter()
            .filter(|p| {
                let author = p.author.as_ref().and_then(|a| a.username()).unwrap_or_default();
                needle.is_empty()
                    || p.title.to_lowercase().contains(&needle)
                    || p.category.to_lowercase().contains(&needle)
                    || author.to_lowercase().contains(&needle)
            })
            .map(|p| PostRow {
                id: p.id.clone(),
                title: p.title.clone(),
                category: p.category.clone(),
                excerpt: body_excerpt(&p.content, ADMIN_EXCERPT_CHARS),
                author: p.author.as_ref().and_then(|a| a.username()).unwrap_or("Unknown").to_string(),
                date: p.created_at.as_ref().map(format_timestamp).unwrap_or_default(),
                likes: p.tally().likes,
                image: p.featured_image.clone(),
                can_edit: gate.allows(Action::EditPost),
                can_delete: gate.allows(Action::DeletePost),
            })
            .collect();
        Self { rows, query: query.to_string() }
    }
}

#[derive(Debug, Serialize)]
pub struct ModeratedComment {
    pub id: String,
    pub username: String,
    pub text: String,
    pub date: String,
    pub post_title: String,
    pub likes: usize,
    pub dislikes: usize,
    pub can_delete: bool,
}

#[derive(Debug, Serialize)]
pub struct CommentsPanel {
    pub rows: Vec<ModeratedComment>,
    pub query: String,
}

impl CommentsPanel {
    pub fn build(comments: &[Comment], gate: &Gate<'_>, query: &str) -> Self {
        let needle = query.trim().to_lowercase();
        let rows = comments
            .iter()
            .filter(|c| {
                needle.is_empty()
                    || c.text.to_lowercase().contains(&needle)
                    || c.username.to_lowercase().contains(&needle)
            })
            .map(|c| ModeratedComment {
                id: c.id.clone(),
                username: if c.username.is_empty() { "Unknown User".into() } else { c.username.clone() },
                text: c.text.clone(),
                date: c.created_at.as_ref().map(format_timestamp).unwrap_or_default(),
                post_title: c.post_title.clone().unwrap_or_else(|| "Unknown Post".into()),
                likes: c.likes.len(),
                dislikes: c.dislikes.len(),
                can_delete: gate.allows(Action::DeleteComment(c)),
            })
            .collect();
        Self { rows, query: query.to_string() }
    }
}

/// One tab of the dashboard, loaded for display.
#[derive(Debug, Serialize)]
pub struct AdminPage {
    pub tab: &'static str,
    pub tabs: Vec<TabLink>,
    pub welcome: String,
    pub junior_notice: Option<&'static str>,
    pub stats: Option<AdminStats>,
    pub users: Option<UsersPanel>,
    pub posts: Option<PostsPanel>,
    pub comments: Option<CommentsPanel>,
    pub account: Option<ProfileView>,
    pub load_error: Option<String>,
}

pub struct AdminContext<'a> {
    pub api: &'a BackendClient,
    pub session: &'a Session,
    pub caller: &'a User,
    pub main_admin: &'a MainAdminId,
}

impl<'a> AdminContext<'a> {
    fn gate(&self) -> Gate<'a> {
        Gate::new(Some(self.caller), self.main_admin)
    }

    /// Load `tab`. Returns `None` if `scope` was closed while loading.
    pub async fn load(&self, tab: AdminTab, query: &str, scope: &ViewScope) -> Option<AdminPage> {
        let gate = self.gate();
        let mut page = AdminPage {
            tab: tab.as_str(),
            tabs: AdminTab::ALL
                .iter()
                .map(|t| TabLink { id: t.as_str(), label: t.label(), active: *t == tab })
                .collect(),
            welcome: self.caller.username.clone(),
            junior_notice: (!gate.is_main_admin() && tab != AdminTab::Stats && tab != AdminTab::Account)
                .then_some(JUNIOR_NOTICE),
            stats: None,
            users: None,
            posts: None,
            comments: None,
            account: None,
            load_error: None,
        };
        match tab {
            AdminTab::Stats => page.stats = Some(scope.load(load_stats(self.api, self.session)).await?),
            AdminTab::Users => match scope.load(self.api.all_accounts(self.session)).await? {
                Ok(users) => page.users = Some(UsersPanel::build(&users, &gate, query)),
                Err(e) => page.load_error = Some(e.user_message("Failed to load users")),
            },
            AdminTab::Posts => match scope.load(self.api.list_posts(self.session)).await? {
                Ok(posts) => page.posts = Some(PostsPanel::build(&posts, &gate, query)),
                Err(e) => page.load_error = Some(e.user_message("Failed to load posts")),
            },
            AdminTab::Comments => match scope.load(self.api.all_comments(self.session)).await? {
                Ok(comments) => page.comments = Some(CommentsPanel::build(&comments, &gate, query)),
                Err(e) => page.load_error = Some(e.user_message("Failed to load comments")),
            },
            AdminTab::Account => page.account = Some(ProfileView::build(self.caller, true)),
        }
        Some(page)
    }
}

#[derive(Debug, Serialize)]
pub struct AccountRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: &'static str,
    pub avatar: String,
    pub joined: String,
}

pub fn account_rows(users: &[User], query: &str) -> Vec<AccountRow> {
    let needle = query.trim().to_lowercase();
    users
        .iter()
        .filter(|u| {
            needle.is_empty()
                || u.username.to_lowercase().contains(&needle)
                || u.email.to_lowercase().contains(&needle)
        })
        .map(|u| AccountRow {
            id: u.id.clone(),
            username: u.username.clone(),
            email: u.email.clone(),
            role: u.role.as_str(),
            avatar: u.avatar_url(),
            joined: u.created_at.as_ref().map(format_timestamp).unwrap_or_default(),
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct AccountDetail {
    pub profile: ProfileView,
    pub email: String,
    pub blocked: bool,
    pub toggle_verb: &'static str,
    pub can_toggle_block: bool,
    pub can_delete: bool,
}

impl AccountDetail {
    pub fn build(user: &User, gate: &Gate<'_>) -> Self {
        let status = AccountStatus::of(user);
        Self {
            profile: ProfileView::build(user, false),
            email: user.email.clone(),
            blocked: user.blocked,
            toggle_verb: status.toggle_verb(),
            can_toggle_block: gate.allows(Action::ToggleBlock),
            can_delete: gate.allows(Action::DeleteUser),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    ToggleBlock(String),
    SetRole(String, Role),
    DeleteUser(String),
    DeletePost(String),
    DeleteComment(String),
}

impl Mutation {
    fn failure_text(&self) -> &'static str {
        match self {
            Mutation::ToggleBlock(_) => "Failed to update user",
            Mutation::SetRole(..) => "Action failed",
            Mutation::DeleteUser(_) => "Failed to delete user",
            Mutation::DeletePost(_) => "Failed to delete post",
            Mutation::DeleteComment(_) => "Failed to delete comment",
        }
    }
}

/// Outcome text of a mutation, for the page that is shown next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Notice(String),
    Error(String),
}

/// Send `mutation` to the backend. The backend decides; its message is
/// reported verbatim either way.
pub async fn apply(api: &BackendClient, session: &Session, mutation: &Mutation) -> Outcome {
    let result: Result<_, ApiError> = match mutation {
        Mutation::ToggleBlock(id) => api.toggle_block(session, id).await,
        Mutation::SetRole(id, role) => api.set_role(session, id, *role).await,
        Mutation::DeleteUser(id) => api.delete_account(session, id).await,
        Mutation::DeletePost(id) => api.delete_post(session, id).await,
        Mutation::DeleteComment(id) => api.delete_comment(session, id).await,
    };
    match result {
        Ok(ack) => {
            info!(?mutation, "admin action accepted");
            Outcome::Notice(ack.message_or("Action successful"))
        }
        Err(e) => {
            warn!(?mutation, error = %e, "admin action failed");
            Outcome::Error(e.user_message(mutation.failure_text()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRef;

    fn user(id: &str, role: Role) -> User {
        User {
            id: id.into(),
            username: format!("name-{id}"),
            email: format!("{id}@example.com"),
            role,
            blocked: false,
            profile_image: None,
            created_at: None,
        }
    }

    #[test]
    fn tab_parsing_defaults_to_stats() {
        assert_eq!(AdminTab::parse(Some("users")), AdminTab::Users);
        assert_eq!(AdminTab::parse(Some("nope")), AdminTab::Stats);
        assert_eq!(AdminTab::parse(None), AdminTab::Stats);
    }

    #[test]
    fn users_panel_for_main_admin() {
        let main = MainAdminId::new(Some("root".into()));
        let root = user("root", Role::Admin);
        let users = vec![root.clone(), user("a2", Role::Admin), user("u1", Role::User)];
        let panel = UsersPanel::build(&users, &Gate::new(Some(&root), &main), "");
        assert_eq!(panel.admin_count, 2);
        assert!(!panel.limit_reached);
        let u1 = panel.rows.iter().find(|r| r.id == "u1").unwrap();
        assert!(u1.can_promote && !u1.can_demote && u1.can_delete);
        let a2 = panel.rows.iter().find(|r| r.id == "a2").unwrap();
        assert_eq!(a2.admin_ordinal, Some(2));
        assert!(a2.can_demote);
    }

    #[test]
    fn promotion_hidden_at_limit_and_for_junior_admins() {
        let main = MainAdminId::new(Some("root".into()));
        let root = user("root", Role::Admin);
        let users = vec![root.clone(), user("a2", Role::Admin), user("a3", Role::Admin), user("u1", Role::User)];
        let panel = UsersPanel::build(&users, &Gate::new(Some(&root), &main), "");
        assert!(panel.limit_reached);
        assert!(panel.rows.iter().all(|r| !r.can_promote));

        let junior = user("a2", Role::Admin);
        let panel = UsersPanel::build(&users, &Gate::new(Some(&junior), &main), "");
        assert!(panel.rows.iter().all(|r| r.can_toggle_block && !r.can_delete && !r.can_demote));
    }

    #[test]
    fn users_search_matches_name_or_email() {
        let main = MainAdminId::default();
        let caller = user("a", Role::Admin);
        let users = vec![user("alpha", Role::User), user("beta", Role::User)];
        let panel = UsersPanel::build(&users, &Gate::new(Some(&caller), &main), "BETA@");
        assert_eq!(panel.rows.len(), 1);
        assert_eq!(panel.total, 2);
    }

    #[test]
    fn comment_moderation_follows_the_gate() {
        let main = MainAdminId::new(Some("root".into()));
        let junior = user("a2", Role::Admin);
        let root = user("root", Role::Admin);
        let comment = |id: &str, author: &str| Comment {
            id: id.into(),
            post_id: None,
            post_title: None,
            user_id: UserRef::Id(author.into()),
            username: String::new(),
            profile_image: None,
            text: "hello".into(),
            likes: vec![],
            dislikes: vec![],
            created_at: None,
            blocked: false,
        };
        let comments = [comment("c1", "u5"), comment("c2", "a2")];

        let panel = CommentsPanel::build(&comments, &Gate::new(Some(&junior), &main), "");
        assert!(!panel.rows[0].can_delete);
        assert!(panel.rows[1].can_delete);
        assert_eq!(panel.rows[0].username, "Unknown User");
        assert_eq!(panel.rows[0].post_title, "Unknown Post");

        let panel = CommentsPanel::build(&comments, &Gate::new(Some(&root), &main), "");
        assert!(panel.rows.iter().all(|r| r.can_delete));
    }

    #[test]
    fn account_detail_controls() {
        let main = MainAdminId::new(Some("root".into()));
        let root = user("root", Role::Admin);
        let mut target = user("u1", Role::User);
        target.blocked = true;
        let detail = AccountDetail::build(&target, &Gate::new(Some(&root), &main));
        assert_eq!(detail.toggle_verb, "Unblock");
        assert!(detail.can_delete && detail.can_toggle_block);
        assert_eq!(account_rows(&[target], "name-u").len(), 1);
    }
}
