//! Page templates, compiled into the binary.

use serde::Serialize;
use tera::{Context, Tera};
use tracing::error;

use crate::error::PageError;
use crate::models::User;
use crate::preferences::Preferences;
use crate::views::Flash;

const SOURCES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("macros.html", include_str!("../templates/macros.html")),
    ("home.html", include_str!("../templates/home.html")),
    ("blog.html", include_str!("../templates/blog.html")),
    ("read.html", include_str!("../templates/read.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("register.html", include_str!("../templates/register.html")),
    ("profile.html", include_str!("../templates/profile.html")),
    ("editor.html", include_str!("../templates/editor.html")),
    ("admin.html", include_str!("../templates/admin.html")),
    ("accounts.html", include_str!("../templates/accounts.html")),
    ("account_detail.html", include_str!("../templates/account_detail.html")),
    ("not_found.html", include_str!("../templates/not_found.html")),
];

#[derive(Clone)]
pub struct Templates {
    tera: Tera,
}

impl Templates {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(SOURCES.iter().copied())?;
        Ok(Self { tera })
    }

    /// Render `name` inside the shared layout. `page` is exposed to the
    /// template as `page`.
    pub fn render<T: Serialize>(&self, name: &str, layout: &Layout, page: &T) -> Result<String, PageError> {
        let mut context = Context::new();
        context.insert("layout", layout);
        context.insert("page", page);
        self.tera.render(name, &context).map_err(|e| {
            error!(template = name, error = ?e, "template error");
            PageError::Template(e)
        })
    }
}

/// Signed-in user as shown in the navigation bar.
#[derive(Debug, Clone, Serialize)]
pub struct NavUser {
    pub id: String,
    pub username: String,
    pub avatar: String,
    pub is_admin: bool,
}

impl From<&User> for NavUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            avatar: user.avatar_url(),
            is_admin: user.is_admin(),
        }
    }
}

/// What every page's layout needs.
#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub title: String,
    pub theme: &'static str,
    pub query: String,
    pub user: Option<NavUser>,
    pub flash: Flash,
}

impl Layout {
    pub fn new(title: impl Into<String>, prefs: &Preferences, user: Option<&User>, flash: Flash) -> Self {
        Self {
            title: title.into(),
            theme: prefs.theme.as_str(),
            query: prefs.query.clone(),
            user: user.map(NavUser::from),
            flash,
        }
    }
}
