// REST API for the issue tracker

mod auth;
mod comments;
pub mod error;
pub mod extract;
mod issues;
mod projects;
mod users;


use axum::{Router, response::Json, routing::get};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::Authenticator;
use crate::config::AppConfig;
use crate::model::Page;
use crate::tracker::Tracker;

/// Shared handler state. Cheap to clone; holds no per-request data.
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Tracker>,
    pub auth: Arc<Authenticator>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(tracker: Tracker, auth: Authenticator, config: AppConfig) -> Self {
        Self {
            tracker: Arc::new(tracker),
            auth: Arc::new(auth),
            config: Arc::new(config),
        }
    }
}

/// Build the full application router, mounted under the configured prefix.
pub fn create_router(state: AppState) -> Router {
    let prefix = state.config.normalized_prefix();

    let api = Router::new()
        .route("/health", get(health_check))
        .merge(auth::routes())
        .merge(users::routes())
        .merge(projects::routes())
        .merge(issues::routes())
        .merge(comments::routes());

    let router = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(&prefix, api)
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// `skip`/`limit` query parameters shared by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl PageParams {
    pub fn page(&self, default_limit: u32) -> Page {
        Page::new(self.skip.unwrap_or(0), self.limit.unwrap_or(default_limit))
    }
}
