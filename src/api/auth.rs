use axum::{Router, extract::State, response::Json, routing::post};
use serde::Deserialize;

use crate::api::AppState;
use crate::api::extract::{ApiForm, ApiJson};
use crate::error::TrackerError;
use crate::model::{Token, User, UserCreate};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

/// OAuth2 password-grant style form. `username` holds the email address.
#[derive(Debug, Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UserCreate>,
) -> Result<Json<User>, TrackerError> {
    let user = state.auth.signup(&payload).await?;
    Ok(Json(user))
}

async fn login(
    State(state): State<AppState>,
    ApiForm(form): ApiForm<LoginForm>,
) -> Result<Json<Token>, TrackerError> {
    let token = state.auth.login(&form.username, &form.password).await?;
    Ok(Json(token))
}
