//! Client for the blog's REST backend.
//!
//! Every call forwards the browser's session cookie. Replies use the
//! `{success, message?, ...payload}` envelope; a non-2xx status or
//! `success: false` becomes [`ApiError::Rejected`] carrying the backend's
//! message untouched.

use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::ApiError;
use crate::models::{
    Comment, NewComment, NewPost, PasswordChange, Post, ProfileUpdate, Reaction, Registration, Role,
    RoleUpdate, Tally, Upload, User,
};
use crate::session::Session;

/// A decoded reply plus any `Set-Cookie` values the backend sent.
#[derive(Debug, Clone)]
pub struct WithCookies<T> {
    pub value: T,
    pub set_cookies: Vec<String>,
}

/// Acknowledgement of a mutation. Only the backend's message is kept; views
/// re-fetch whatever they display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ack {
    pub message: Option<String>,
}

impl Ack {
    pub fn message_or(&self, fallback: &str) -> String {
        self.message.clone().unwrap_or_else(|| fallback.to_string())
    }
}

struct Reply {
    body: Value,
    set_cookies: Vec<String>,
}

impl Reply {
    fn field<T: DeserializeOwned>(&mut self, key: &str) -> Result<T, ApiError> {
        let raw = self.body.get_mut(key).map(Value::take).unwrap_or(Value::Null);
        serde_json::from_value(raw).map_err(|e| {
            error!(field = key, error = %e, "backend payload did not decode");
            ApiError::Decode(format!("{key}: {e}"))
        })
    }

    fn ack(&self) -> Ack {
        Ack { message: message_of(&self.body) }
    }
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self { http: Client::new(), base_url: base_url.trim_end_matches('/').to_string() }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---------- posts ----------

    pub async fn list_posts(&self, session: &Session) -> Result<Vec<Post>, ApiError> {
        self.call(Method::GET, "/posts", session).await?.field("blogs")
    }

    pub async fn get_post(&self, session: &Session, id: &str) -> Result<Post, ApiError> {
        self.call(Method::GET, &format!("/posts/{}", seg(id)), session).await?.field("blog")
    }

    pub async fn create_post(&self, session: &Session, post: NewPost) -> Result<Post, ApiError> {
        let form = post_form(post)?;
        let req = self.request(Method::POST, "/posts/create", session).multipart(form);
        self.send(req).await?.field("post")
    }

    pub async fn update_post(&self, session: &Session, id: &str, post: NewPost) -> Result<Post, ApiError> {
        let form = post_form(post)?;
        let req = self.request(Method::PUT, &format!("/posts/{}", seg(id)), session).multipart(form);
        self.send(req).await?.field("post")
    }

    pub async fn delete_post(&self, session: &Session, id: &str) -> Result<Ack, ApiError> {
        Ok(self.call(Method::DELETE, &format!("/posts/{}", seg(id)), session).await?.ack())
    }

    pub async fn react_to_post(&self, session: &Session, id: &str, reaction: Reaction) -> Result<Tally, ApiError> {
        let path = format!("/posts/{}/{}", seg(id), reaction.path_segment());
        let reply = self.call(Method::POST, &path, session).await?;
        serde_json::from_value(reply.body).map_err(|e| ApiError::Decode(format!("tally: {e}")))
    }

    /// Upload an image for the editor; returns its public URL.
    pub async fn upload_image(&self, session: &Session, upload: Upload) -> Result<String, ApiError> {
        let form = Form::new().part("image", file_part(upload)?);
        let req = self.request(Method::POST, "/posts/upload-image", session).multipart(form);
        let mut reply = self.send(req).await?;
        let file: Value = reply.field("file")?;
        file.get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::Decode("upload reply has no file url".into()))
    }

    // ---------- accounts ----------

    /// The signed-in user, or `None` when the backend does not recognise the
    /// session.
    pub async fn current_user(&self, session: &Session) -> Result<Option<User>, ApiError> {
        if session.is_anonymous() {
            return Ok(None);
        }
        match self.call(Method::GET, "/user/me", session).await {
            Ok(mut reply) => reply.field("user").map(Some),
            Err(ApiError::Rejected { status, .. }) if status == 401 || status == 403 => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<WithCookies<User>, ApiError> {
        let form = Form::new()
            .text("email", email.to_string())
            .text("password", password.to_string());
        let req = self.request(Method::POST, "/user/login", &Session::anonymous()).multipart(form);
        let mut reply = self.send(req).await?;
        let user = reply.field("user")?;
        Ok(WithCookies { value: user, set_cookies: reply.set_cookies })
    }

    pub async fn register(&self, registration: Registration) -> Result<WithCookies<User>, ApiError> {
        let mut form = Form::new()
            .text("email", registration.email)
            .text("username", registration.username)
            .text("password", registration.password);
        if let Some(image) = registration.profile_image {
            form = form.part("profileImage", file_part(image)?);
        }
        let req = self.request(Method::POST, "/user/register", &Session::anonymous()).multipart(form);
        let mut reply = self.send(req).await?;
        let user = reply.field("user")?;
        Ok(WithCookies { value: user, set_cookies: reply.set_cookies })
    }

    pub async fn logout(&self, session: &Session) -> Result<WithCookies<Ack>, ApiError> {
        let reply = self.call(Method::POST, "/user/logout", session).await?;
        Ok(WithCookies { value: reply.ack(), set_cookies: reply.set_cookies })
    }

    pub async fn update_me(&self, session: &Session, update: ProfileUpdate) -> Result<User, ApiError> {
        let mut form = Form::new().text("username", update.username);
        if let Some(image) = update.profile_image {
            form = form.part("profileImage", file_part(image)?);
        }
        let req = self.request(Method::PUT, "/user/update/me", session).multipart(form);
        self.send(req).await?.field("user")
    }

    pub async fn change_password(&self, session: &Session, change: &PasswordChange) -> Result<Ack, ApiError> {
        let req = self.request(Method::PUT, "/user/change-password", session).json(change);
        Ok(self.send(req).await?.ack())
    }

    pub async fn all_accounts(&self, session: &Session) -> Result<Vec<User>, ApiError> {
        self.call(Method::GET, "/user/all-accounts", session).await?.field("users")
    }

    pub async fn public_profile(&self, session: &Session, id: &str) -> Result<User, ApiError> {
        self.call(Method::GET, &format!("/user/profile/{}", seg(id)), session).await?.field("user")
    }

    pub async fn admin_account(&self, session: &Session, id: &str) -> Result<User, ApiError> {
        self.call(Method::GET, &format!("/user/admin/account/{}", seg(id)), session)
            .await?
            .field("user")
    }

    pub async fn set_role(&self, session: &Session, id: &str, role: Role) -> Result<Ack, ApiError> {
        let req = self
            .request(Method::PUT, &format!("/user/admin/account/{}", seg(id)), session)
            .json(&RoleUpdate { role });
        Ok(self.send(req).await?.ack())
    }

    pub async fn toggle_block(&self, session: &Session, id: &str) -> Result<Ack, ApiError> {
        let path = format!("/user/admin/account/{}/block", seg(id));
        Ok(self.call(Method::PUT, &path, session).await?.ack())
    }

    pub async fn delete_account(&self, session: &Session, id: &str) -> Result<Ack, ApiError> {
        let path = format!("/user/admin/account/{}", seg(id));
        Ok(self.call(Method::DELETE, &path, session).await?.ack())
    }

    // ---------- comments ----------

    pub async fn comments_for(&self, session: &Session, post_id: &str) -> Result<Vec<Comment>, ApiError> {
        self.call(Method::GET, &format!("/comments/{}", seg(post_id)), session)
            .await?
            .field("comments")
    }

    /// Every comment on the site, with post titles (admin listing).
    pub async fn all_comments(&self, session: &Session) -> Result<Vec<Comment>, ApiError> {
        self.call(Method::GET, "/user/comments", session).await?.field("comments")
    }

    pub async fn post_comment(&self, session: &Session, post_id: &str, comment: &NewComment) -> Result<Ack, ApiError> {
        let req = self
            .request(Method::POST, &format!("/comments/{}", seg(post_id)), session)
            .json(comment);
        Ok(self.send(req).await?.ack())
    }

    pub async fn react_to_comment(&self, session: &Session, id: &str, reaction: Reaction) -> Result<Ack, ApiError> {
        let path = format!("/comments/{}/{}", seg(id), reaction.path_segment());
        Ok(self.call(Method::POST, &path, session).await?.ack())
    }

    pub async fn delete_comment(&self, session: &Session, id: &str) -> Result<Ack, ApiError> {
        Ok(self.call(Method::DELETE, &format!("/comments/{}", seg(id)), session).await?.ack())
    }

    // ---------- plumbing ----------

    fn request(&self, method: Method, path: &str, session: &Session) -> RequestBuilder {
        let url = format!("{}/api{}", self.base_url, path);
        let mut req = self.http.request(method, url);
        if let Some(cookie) = session.cookie_header() {
            req = req.header(COOKIE, cookie);
        }
        req
    }

    async fn call(&self, method: Method, path: &str, session: &Session) -> Result<Reply, ApiError> {
        self.send(self.request(method, path, session)).await
    }

    async fn send(&self, req: RequestBuilder) -> Result<Reply, ApiError> {
        let resp = req.send().await.map_err(|e| {
            error!(error = %e, "backend unreachable");
            ApiError::Network(e)
        })?;
        let status = resp.status();
        let url = resp.url().path().to_string();
        let set_cookies = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect();
        let text = resp.text().await.map_err(ApiError::Network)?;
        let body: Option<Value> = serde_json::from_str(&text).ok();

        let rejected = !status.is_success()
            || body.as_ref().and_then(|b| b.get("success")).and_then(Value::as_bool) == Some(false);
        if rejected {
            let message = body.as_ref().and_then(message_of);
            warn!(%url, status = status.as_u16(), message = message.as_deref().unwrap_or(""), "backend rejected request");
            return Err(ApiError::rejected(status.as_u16(), message));
        }
        match body {
            Some(body) => {
                debug!(%url, status = status.as_u16(), "backend reply");
                Ok(Reply { body, set_cookies })
            }
            None if status == StatusCode::NO_CONTENT => Ok(Reply { body: Value::Null, set_cookies }),
            None => {
                error!(%url, "backend reply is not JSON");
                Err(ApiError::Decode(format!("{url}: reply is not JSON")))
            }
        }
    }
}

fn message_of(body: &Value) -> Option<String> {
    body.get("message").and_then(Value::as_str).map(str::to_string)
}

fn seg(id: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(id)
}

fn file_part(upload: Upload) -> Result<Part, ApiError> {
    Part::bytes(upload.bytes)
        .file_name(upload.file_name)
        .mime_str(&upload.mime)
        .map_err(|e| ApiError::Decode(format!("upload mime {:?}: {e}", upload.mime)))
}

fn post_form(post: NewPost) -> Result<Form, ApiError> {
    let content = serde_json::to_string(&post.content)
        .map_err(|e| ApiError::Decode(format!("content: {e}")))?;
    let mut form = Form::new()
        .text("title", post.title)
        .text("content", content)
        .text("category", post.category);
    if let Some(image) = post.featured_image {
        form = form.part("featuredImage", file_part(image)?);
    }
    Ok(form)
}
