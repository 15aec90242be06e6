use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::get,
};

use crate::api::extract::{ApiJson, ApiQuery, AuthUser};
use crate::api::{AppState, PageParams};
use crate::error::TrackerError;
use crate::model::{Comment, CommentCreate, Page};
use crate::types::IssueId;

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/comments/issue/{issue_id}",
        get(list_comments).post(create_comment),
    )
}

async fn list_comments(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(issue_id): Path<IssueId>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Vec<Comment>>, TrackerError> {
    let page = params.page(Page::DEFAULT_LIMIT);
    Ok(Json(
        state.tracker.list_comments(&principal, &issue_id, page).await?,
    ))
}

async fn create_comment(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(issue_id): Path<IssueId>,
    ApiJson(payload): ApiJson<CommentCreate>,
) -> Result<Json<Comment>, TrackerError> {
    Ok(Json(
        state
            .tracker
            .create_comment(&principal, &issue_id, &payload)
            .await?,
    ))
}
