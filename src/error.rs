//! Error types surfaced by the tracker services.

use std::fmt;

use crate::auth::AuthError;
use crate::policy::{ConflictReason, Decision, ForbiddenReason};

/// Kind of record a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User,
    Project,
    Issue,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Project => "project",
            Self::Issue => "issue",
        }
    }
}

/// Errors returned by tracker operations.
///
/// Every variant maps to exactly one HTTP status in the API layer. Only
/// `Database` carries internal detail, and that detail is logged rather than
/// returned to clients.
#[derive(Debug, Clone)]
pub enum TrackerError {
    /// Missing, invalid or expired token, or a failed login.
    Unauthenticated(AuthError),
    /// Referenced record does not exist.
    NotFound(Resource),
    /// Membership, role or ownership check failed.
    Forbidden(ForbiddenReason),
    /// Duplicate email, project key or membership.
    Conflict(ConflictReason),
    /// Malformed request payload.
    Validation(String),
    /// Storage failure.
    Database(String),
}

impl TrackerError {
    /// Stable machine-readable code for API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(e) => e.code(),
            Self::NotFound(_) => "not_found",
            Self::Forbidden(reason) => reason.code(),
            Self::Conflict(reason) => reason.code(),
            Self::Validation(_) => "invalid_input",
            Self::Database(_) => "internal_error",
        }
    }
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated(e) => write!(f, "{}", e),
            Self::NotFound(Resource::User) => write!(f, "User not found"),
            Self::NotFound(Resource::Project) => write!(f, "Project not found"),
            Self::NotFound(Resource::Issue) => write!(f, "Issue not found"),
            Self::Forbidden(reason) => write!(f, "{}", reason),
            Self::Conflict(reason) => write!(f, "{}", reason),
            Self::Validation(msg) => write!(f, "{}", msg),
            Self::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for TrackerError {}

/// Result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

impl From<anyhow::Error> for TrackerError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<AuthError> for TrackerError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Database(msg) => Self::Database(msg),
            other => Self::Unauthenticated(other),
        }
    }
}

impl Decision {
    /// Turn a decision into `Ok(())` or the matching error.
    pub fn into_result(self) -> TrackerResult<()> {
        match self {
            Self::Allow => Ok(()),
            Self::Forbidden(reason) => Err(TrackerError::Forbidden(reason)),
            Self::Conflict(reason) => Err(TrackerError::Conflict(reason)),
        }
    }
}
