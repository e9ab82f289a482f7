use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use tracing::error;

use crate::content::render::html_escape;

pub const NETWORK_MESSAGE: &str = "Network error. Please check your connection.";

/// Failure talking to the REST backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{}", NETWORK_MESSAGE)]
    Network(#[source] reqwest::Error),
    #[error("{}", .message.as_deref().unwrap_or("request rejected by backend"))]
    Rejected { status: u16, message: Option<String> },
    #[error("unexpected response from backend: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn rejected(status: u16, message: Option<String>) -> Self {
        ApiError::Rejected { status, message: message.filter(|m| !m.trim().is_empty()) }
    }

    /// Text shown to the user. Backend messages are passed through verbatim;
    /// `fallback` covers rejections without one and undecodable replies.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Network(_) => NETWORK_MESSAGE.to_string(),
            ApiError::Rejected { message: Some(m), .. } => m.clone(),
            ApiError::Rejected { message: None, .. } | ApiError::Decode(_) => fallback.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// A form input rejected before any request is made.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("Comment cannot be empty")]
    EmptyComment,
    #[error("Comment cannot exceed {0} characters")]
    CommentTooLong(usize),
    #[error("New passwords do not match")]
    PasswordMismatch,
    #[error("Password must be at least {0} characters long")]
    PasswordTooShort(usize),
    #[error("Current password is required")]
    CurrentPasswordMissing,
    #[error("No changes to save")]
    NoChanges,
    #[error("Only image files are allowed")]
    NotAnImage,
}

/// Failure of a page handler. Rendered as a standalone error page so it still
/// works when templating itself is what failed.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
    #[error("{0}")]
    Internal(String),
}

impl PageError {
    fn public_message(&self) -> String {
        match self {
            PageError::NotFound(what) => what.clone(),
            PageError::Api(e) => e.user_message("The server could not complete this request."),
            PageError::Template(_) | PageError::Internal(_) => "Something went wrong.".to_string(),
        }
    }
}

impl ResponseError for PageError {
    fn status_code(&self) -> StatusCode {
        match self {
            PageError::NotFound(_) => StatusCode::NOT_FOUND,
            PageError::Api(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            PageError::Api(ApiError::Network(_)) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "page failed");
        }
        HttpResponse::build(status)
            .content_type("text/html; charset=utf-8")
            .body(error_page(status, &self.public_message()))
    }
}

fn error_page(status: StatusCode, message: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><title>{code} | Quire</title>\
         <link rel=\"stylesheet\" href=\"/assets/quire.css\"></head><body><main class=\"error-page\">\
         <h1>{code}</h1><p class=\"error-message\">{msg}</p>\
         <p><a class=\"button\" href=\"\">Reload page</a> <a href=\"/\">Back to home</a></p>\
         </main></body></html>",
        code = status.as_u16(),
        msg = html_escape(message),
    )
}
