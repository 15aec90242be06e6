//! Request extractors: the authenticated caller and body/query parsers that
//! report failures in the API's error format.

use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{header, request::Parts},
    Form, Json,
};
use serde::de::DeserializeOwned;

use crate::api::AppState;
use crate::auth::Principal;
use crate::error::TrackerError;

/// The authenticated principal of the current request.
pub struct AuthUser(pub Principal);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = TrackerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let authorization = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let principal = state.auth.authenticate(authorization).await?;
        Ok(Self(principal))
    }
}

/// Wraps an axum extractor so its rejection becomes `TrackerError::Validation`.
macro_rules! validating_extractor {
    (
        $(#[$meta:meta])*
        $name:ident => $inner:ident
    ) => {
        $(#[$meta])*
        pub struct $name<T>(pub T);

        impl<T, S> FromRequest<S> for $name<T>
        where
            T: DeserializeOwned + Send,
            S: Send + Sync,
        {
            type Rejection = TrackerError;

            async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
                let $inner(value) = $inner::<T>::from_request(req, state)
                    .await
                    .map_err(|e| TrackerError::Validation(e.body_text()))?;
                Ok(Self(value))
            }
        }
    };
}

validating_extractor!(
    /// JSON request body.
    ApiJson => Json
);

validating_extractor!(
    /// URL-encoded form body.
    ApiForm => Form
);

/// Query string parameters.
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = TrackerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| TrackerError::Validation(e.body_text()))?;
        Ok(Self(value))
    }
}
