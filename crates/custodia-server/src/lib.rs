//! HTTP server for the Custodia identity backend.
//!
//! Exposes the user/account/profile CRUD API as JSON REST, provisions the
//! database through the migration engine at startup and sends signup
//! confirmation mails post-commit.

pub mod config;
pub mod error;
pub mod observability;
pub mod routes;
pub mod server;

pub use config::AppConfig;
pub use error::ApiError;
pub use server::{AppState, Server};
