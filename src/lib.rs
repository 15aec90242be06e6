// Core modules
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod policy;
pub mod tracker;
pub mod types;

// Re-export key types and functions
pub use auth::{AuthConfig, AuthError, Authenticator, Principal};
pub use config::AppConfig;
pub use db::{DatabaseConfig, create_connection, ensure_schema};
pub use error::{TrackerError, TrackerResult};
pub use policy::{Action, Decision, authorize};
pub use tracker::Tracker;

use anyhow::Result;
use axum::Router;
use tracing::warn;

/// Convenience function to build the fully wired HTTP application.
///
/// Connects to the database, ensures the schema, and returns the router with
/// tracker and authentication state attached.
pub async fn create_app(db_config: DatabaseConfig, config: AppConfig) -> Result<Router> {
    let tracker = Tracker::connect(db_config).await?;

    let auth_config = config.auth_config();
    if auth_config.uses_dev_secret() {
        warn!("SECRET_KEY is not set; using the development signing secret");
    }
    let auth = Authenticator::new(auth_config, tracker.db().clone());

    let state = api::AppState::new(tracker, auth, config);
    Ok(api::create_router(state))
}
