//! Per-request reader preferences: colour theme and the current search term.

use actix_web::cookie::{Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use serde::{Deserialize, Serialize};

pub const THEME_COOKIE: &str = "theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn cookie(self) -> Cookie<'static> {
        Cookie::build(THEME_COOKIE, self.as_str())
            .path("/")
            .same_site(SameSite::Lax)
            .permanent()
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Preferences {
    pub theme: Theme,
    pub query: String,
}

impl Preferences {
    pub fn from_request_parts(req: &HttpRequest) -> Self {
        let theme = req
            .cookie(THEME_COOKIE)
            .and_then(|c| Theme::parse(c.value()))
            .unwrap_or_default();
        let query = web::Query::<SearchQuery>::from_query(req.query_string())
            .ok()
            .and_then(|q| q.into_inner().q)
            .map(|q| q.trim().to_string())
            .unwrap_or_default();
        Self { theme, query }
    }
}

impl FromRequest for Preferences {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(Preferences::from_request_parts(req)))
    }
}
