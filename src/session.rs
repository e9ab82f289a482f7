use actix_web::cookie::{Cookie, SameSite};
use actix_web::{dev::Payload, web, Error, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use tracing::warn;

use crate::models::User;
use crate::routes::AppState;

/// Name of the backend's session cookie.
pub const SESSION_COOKIE: &str = "token";

/// The browser's backend session, forwarded verbatim on every backend call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { token: None }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self { token: Some(token.into()) }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.token.is_none()
    }

    /// Value for a `Cookie` request header.
    pub fn cookie_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("{SESSION_COOKIE}={t}"))
    }

    fn from_request_cookies(req: &HttpRequest) -> Self {
        match req.cookie(SESSION_COOKIE) {
            Some(c) if !c.value().is_empty() => Self::with_token(c.value()),
            _ => Self::anonymous(),
        }
    }
}

impl FromRequest for Session {
    type Error = Error;
    type Future = Ready<Result<Self, Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(Session::from_request_cookies(req)))
    }
}

/// Session plus the signed-in user, if the backend recognises the session.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub session: Session,
    pub user: Option<User>,
}

impl Viewer {
    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}

impl FromRequest for Viewer {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let session = Session::from_request_cookies(req);
        let state = req.app_data::<web::Data<AppState>>().cloned();
        Box::pin(async move {
            let Some(state) = state else {
                return Err(actix_web::error::ErrorInternalServerError("app state missing"));
            };
            if session.is_anonymous() {
                return Ok(Viewer { session, user: None });
            }
            // an unreachable backend reads as signed out; pages still render
            let user = match state.api.current_user(&session).await {
                Ok(user) => user,
                Err(e) => {
                    warn!(error = %e, "could not resolve current user");
                    None
                }
            };
            Ok(Viewer { session, user })
        })
    }
}

/// Rewrite a backend `Set-Cookie` value for the browser. The backend's
/// domain and path attributes do not apply to this host, so they are reset.
pub fn relay_cookie(raw: &str) -> Option<Cookie<'static>> {
    let parsed = Cookie::parse(raw.to_string()).ok()?;
    let mut cookie = Cookie::new(parsed.name().to_string(), parsed.value().to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(parsed.same_site().unwrap_or(SameSite::Lax));
    if let Some(secure) = parsed.secure() {
        cookie.set_secure(secure);
    }
    if let Some(max_age) = parsed.max_age() {
        cookie.set_max_age(max_age);
    }
    if let Some(expires) = parsed.expires() {
        cookie.set_expires(expires);
    }
    Some(cookie)
}

/// Cookie that removes the session from the browser.
pub fn clear_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookie.make_removal();
    cookie
}
