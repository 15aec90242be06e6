//! Mapping of tracker errors onto HTTP responses.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{debug, error};

use crate::auth::AuthError;
use crate::error::TrackerError;

/// JSON error body: `{"detail": ..., "code": ...}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
    pub code: &'static str,
}

impl TrackerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = self.status();

        let detail = match &self {
            Self::Database(msg) => {
                error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            Self::NotFound(resource) => {
                debug!("Lookup failed for {}", resource.as_str());
                self.to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            detail,
            code: self.code(),
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        TrackerError::from(self).into_response()
    }
}
