use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::get,
};
use serde::Deserialize;

use crate::api::AppState;
use crate::api::extract::{ApiJson, ApiQuery, AuthUser};
use crate::error::TrackerError;
use crate::model::{
    Issue, IssueCreate, IssueFilter, IssueList, IssuePriority, IssueStatus, IssueUpdate, Page,
};
use crate::types::{IssueId, ProjectId, UserId};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/issues", get(list_issues).post(create_issue))
        .route("/issues/", get(list_issues).post(create_issue))
        .route("/issues/{id}", get(read_issue).patch(update_issue))
}

/// Issue listing query string. Kept flat because url-encoded numbers do not
/// survive `#[serde(flatten)]`.
#[derive(Debug, Default, Deserialize)]
struct IssueListParams {
    project_id: Option<ProjectId>,
    status: Option<IssueStatus>,
    priority: Option<IssuePriority>,
    assignee_id: Option<UserId>,
    skip: Option<u32>,
    limit: Option<u32>,
}

impl IssueListParams {
    fn split(self) -> (IssueFilter, Page) {
        let page = Page::new(
            self.skip.unwrap_or(0),
            self.limit.unwrap_or(Page::DEFAULT_LIMIT),
        );
        let filter = IssueFilter {
            project_id: self.project_id,
            status: self.status,
            priority: self.priority,
            assignee_id: self.assignee_id,
        };
        (filter, page)
    }
}

async fn list_issues(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiQuery(params): ApiQuery<IssueListParams>,
) -> Result<Json<IssueList>, TrackerError> {
    let (filter, page) = params.split();
    Ok(Json(
        state.tracker.list_issues(&principal, &filter, page).await?,
    ))
}

async fn create_issue(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiJson(payload): ApiJson<IssueCreate>,
) -> Result<Json<Issue>, TrackerError> {
    Ok(Json(state.tracker.create_issue(&principal, &payload).await?))
}

async fn read_issue(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<IssueId>,
) -> Result<Json<Issue>, TrackerError> {
    Ok(Json(state.tracker.get_issue(&principal, &id).await?))
}

async fn update_issue(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<IssueId>,
    ApiJson(payload): ApiJson<IssueUpdate>,
) -> Result<Json<Issue>, TrackerError> {
    Ok(Json(
        state.tracker.update_issue(&principal, &id, &payload).await?,
    ))
}
