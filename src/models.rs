use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::{ContentDocument, PostBody};

// Backend ids are opaque strings (Mongo object ids on the wire)
pub type Id = String;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    pub username: String,
    #[serde(default)]
    pub email: String, // omitted by the public profile endpoint
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Profile image, or a generated initials avatar.
    pub fn avatar_url(&self) -> String {
        avatar_url(self.profile_image.as_deref(), &self.username)
    }
}

pub fn avatar_url(profile_image: Option<&str>, username: &str) -> String {
    match profile_image {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => format!("https://ui-avatars.com/api/?name={}", urlencoding::encode(username)),
    }
}

/// Minimal author projection the backend embeds when it populates a reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

/// A user reference that may or may not have been populated server-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum UserRef {
    Populated(UserSummary),
    Id(Id),
}

impl UserRef {
    pub fn id(&self) -> &str {
        match self {
            UserRef::Populated(u) => &u.id,
            UserRef::Id(id) => id,
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            UserRef::Populated(u) if !u.username.is_empty() => Some(&u.username),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: Id,
    pub title: String,
    #[serde(default)]
    pub content: PostBody,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<UserRef>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub likes: Vec<Id>,
    #[serde(default)]
    pub dislikes: Vec<Id>,
    #[serde(default)]
    pub views: u64,
}

impl Post {
    pub fn tally(&self) -> Tally {
        Tally { likes: self.likes.len() as u64, dislikes: self.dislikes.len() as u64 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_title: Option<String>, // only on the admin listing
    pub user_id: UserRef,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    pub text: String,
    #[serde(default)]
    pub likes: Vec<Id>,
    #[serde(default)]
    pub dislikes: Vec<Id>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub blocked: bool, // snapshot of the author's blocked flag
}

impl Comment {
    pub fn author_id(&self) -> &str {
        self.user_id.id()
    }

    pub fn avatar_url(&self) -> String {
        avatar_url(self.profile_image.as_deref(), &self.username)
    }
}

/// Like / dislike counts as returned by the reaction endpoints.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tally {
    pub likes: u64,
    pub dislikes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    pub fn path_segment(&self) -> &'static str {
        match self {
            Reaction::Like => "like",
            Reaction::Dislike => "dislike",
        }
    }
}

// ---------------- outgoing payloads ----------------

/// A file picked by the user, buffered for forwarding.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub category: String,
    pub content: ContentDocument,
    pub featured_image: Option<Upload>,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
    pub profile_image: Option<Upload>,
}

#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub username: String,
    pub profile_image: Option<Upload>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleUpdate {
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewComment {
    pub text: String,
}
