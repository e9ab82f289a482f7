use std::env;

use thiserror::Error;

use crate::content::widget::DEFAULT_EDITOR_CDN;
use crate::permissions::MainAdminId;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("QUIRE_PORT must be a port number, got {0:?}")]
    Port(String),
    #[error("QUIRE_BACKEND_URL must start with http:// or https://, got {0:?}")]
    BackendUrl(String),
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub backend_url: String,
    pub main_admin: MainAdminId,
    pub bind: String,
    pub port: u16,
    pub enable_hsts: bool,
    pub editor_cdn: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            main_admin: MainAdminId::default(),
            bind: "0.0.0.0".to_string(),
            port: 8080,
            enable_hsts: false,
            editor_cdn: DEFAULT_EDITOR_CDN.to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        let port = match env::var("QUIRE_PORT") {
            Ok(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::Port(raw))?,
            Err(_) => defaults.port,
        };
        let settings = Settings {
            backend_url: env::var("QUIRE_BACKEND_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.backend_url),
            main_admin: MainAdminId::new(env::var("QUIRE_MAIN_ADMIN_ID").ok()),
            bind: env::var("QUIRE_BIND").unwrap_or(defaults.bind),
            port,
            enable_hsts: env::var("ENABLE_HSTS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            editor_cdn: env::var("QUIRE_EDITOR_CDN")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.editor_cdn),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.backend_url.starts_with("http://") || self.backend_url.starts_with("https://")) {
            return Err(ConfigError::BackendUrl(self.backend_url.clone()));
        }
        Ok(())
    }

    /// Origin of the editor CDN, for the content security policy.
    pub fn editor_origin(&self) -> String {
        origin_of(&self.editor_cdn)
    }
}

fn origin_of(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let host = rest.split('/').next().unwrap_or(rest);
    format!("{scheme}://{host}")
}
