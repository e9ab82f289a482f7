//! Page models. Each view turns backend data plus the caller's permissions
//! into a plain struct that a template can render.

pub mod account;
pub mod admin;
pub mod comments;
pub mod editor;
pub mod listing;
pub mod reader;
pub mod scope;

use serde::{Deserialize, Serialize};

pub use scope::ViewScope;

/// One-shot message carried to the next page in the query string after a
/// form post.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Flash {
    pub notice: Option<String>,
    pub error: Option<String>,
}

impl Flash {
    pub fn notice(message: impl Into<String>) -> Self {
        Self { notice: Some(message.into()), error: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { notice: None, error: Some(message.into()) }
    }

    pub fn is_empty(&self) -> bool {
        self.notice.is_none() && self.error.is_none()
    }

    /// `path` with this message appended as a query parameter.
    pub fn redirect_to(&self, path: &str) -> String {
        let sep = if path.contains('?') { '&' } else { '?' };
        match (&self.notice, &self.error) {
            (_, Some(e)) => format!("{path}{sep}error={}", urlencoding::encode(e)),
            (Some(n), None) => format!("{path}{sep}notice={}", urlencoding::encode(n)),
            (None, None) => path.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_carries_message() {
        assert_eq!(Flash::notice("Saved!").redirect_to("/profile"), "/profile?notice=Saved%21");
        assert_eq!(
            Flash::error("No way").redirect_to("/admin?tab=users"),
            "/admin?tab=users&error=No%20way"
        );
        assert_eq!(Flash::default().redirect_to("/"), "/");
    }
}
