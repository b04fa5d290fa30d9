pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod form;
pub mod handler;
pub mod logging;
pub mod tui;
pub mod ui;

// Re-export main types for convenience
pub use api::{ApiError, CrewClient, CrewResponse};
pub use app::App;
pub use auth::{OidcClient, Session, User};
pub use config::Config;
pub use form::RequestForm;
