pub mod api;
pub mod config;
pub mod content;
pub mod error;
pub mod forms;
pub mod models;
pub mod permissions;
pub mod preferences;
pub mod routes;
pub mod security;
pub mod session;
pub mod templates;
pub mod views;

// Re-export commonly used items for tests / external users
pub use config::Settings;
pub use routes::{config, AppState};
pub use security::SecurityHeaders;
