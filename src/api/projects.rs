use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::get,
};

use crate::api::extract::{ApiJson, ApiQuery, AuthUser};
use crate::api::{AppState, PageParams};
use crate::error::TrackerError;
use crate::model::{
    MemberWithUser, Page, Project, ProjectCreate, ProjectMember, ProjectMemberCreate,
    ProjectUpdate,
};
use crate::types::ProjectId;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/", get(list_projects).post(create_project))
        .route("/projects/{id}", get(read_project).patch(update_project))
        .route("/projects/{id}/members", get(list_members).post(add_member))
}

async fn list_projects(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Vec<Project>>, TrackerError> {
    let page = params.page(Page::DEFAULT_LIMIT);
    Ok(Json(state.tracker.list_projects(&principal, page).await?))
}

async fn create_project(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiJson(payload): ApiJson<ProjectCreate>,
) -> Result<Json<Project>, TrackerError> {
    Ok(Json(state.tracker.create_project(&principal, &payload).await?))
}

async fn read_project(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<ProjectId>,
) -> Result<Json<Project>, TrackerError> {
    Ok(Json(state.tracker.get_project(&principal, &id).await?))
}

async fn update_project(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<ProjectId>,
    ApiJson(payload): ApiJson<ProjectUpdate>,
) -> Result<Json<Project>, TrackerError> {
    Ok(Json(
        state.tracker.update_project(&principal, &id, &payload).await?,
    ))
}

async fn list_members(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<ProjectId>,
) -> Result<Json<Vec<MemberWithUser>>, TrackerError> {
    Ok(Json(state.tracker.list_members(&principal, &id).await?))
}

async fn add_member(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<ProjectId>,
    ApiJson(payload): ApiJson<ProjectMemberCreate>,
) -> Result<Json<ProjectMember>, TrackerError> {
    Ok(Json(state.tracker.add_member(&principal, &id, &payload).await?))
}
