use axum::{Router, extract::State, response::Json, routing::get};

use crate::api::extract::{ApiQuery, AuthUser};
use crate::api::{AppState, PageParams};
use crate::error::TrackerError;
use crate::model::{Page, User};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(read_me))
        .route("/users", get(list_users))
        .route("/users/", get(list_users))
}

async fn read_me(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<User>, TrackerError> {
    Ok(Json(state.tracker.current_user(&principal).await?))
}

async fn list_users(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Vec<User>>, TrackerError> {
    let page = params.page(Page::DEFAULT_USER_LIMIT);
    Ok(Json(state.tracker.list_users(&principal, page).await?))
}
