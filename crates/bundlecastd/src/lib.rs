//! bundlecastd: the HTTP boundary over `bundlecast-core`.
//!
//! - `GET /v1/updates/poll` resolves and returns module bundles
//! - `POST /v1/updates/push` publishes a release (bearer token)
//! - `DELETE /v1/updates/delete/:commit_hash` retracts one (bearer token)

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod server;

pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use routes::{create_router, AppState};
