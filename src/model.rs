//! Domain types for users, projects, memberships, issues and comments.
//!
//! Two role axes exist and are deliberately separate types: [`GlobalRole`]
//! describes an account, [`ProjectRole`] describes a membership. A global
//! `maintainer` has no special rights inside a project.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::TrackerError;
use crate::types::{CommentId, IssueId, MembershipId, ProjectId, UserId};

/// Macro to generate a closed string enumeration with `as_str`/`FromStr`.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $value:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Wire and storage representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $value),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok(Self::$variant),)+
                    other => Err(format!(
                        "unknown {} value: {}",
                        stringify!($name),
                        other
                    )),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(
    /// Account-wide role. Never consulted by project authorization.
    GlobalRole {
        #[default]
        User => "user",
        Maintainer => "maintainer",
    }
);

string_enum!(
    /// Role held by a user inside one project.
    ProjectRole {
        Maintainer => "maintainer",
        #[default]
        Member => "member",
    }
);

string_enum!(
    IssueStatus {
        #[default]
        Open => "open",
        InProgress => "in_progress",
        Resolved => "resolved",
        Closed => "closed",
    }
);

string_enum!(
    IssuePriority {
        Low => "low",
        #[default]
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
);

/// Public view of a user account. The password hash never leaves the
/// credential store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub role: GlobalRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub key: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub id: MembershipId,
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub role: ProjectRole,
}

impl ProjectMember {
    pub fn is_maintainer(&self) -> bool {
        self.role == ProjectRole::Maintainer
    }
}

/// A membership row joined with the member's public user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberWithUser {
    #[serde(flatten)]
    pub member: ProjectMember,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub status: IssueStatus,
    pub priority: IssuePriority,
    pub reporter_id: UserId,
    pub assignee_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub issue_id: IssueId,
    pub author_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Paginated issue listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueList {
    pub items: Vec<Issue>,
    pub total: u64,
    pub skip: u32,
    pub limit: u32,
}

/// Access token returned by the login flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

impl Token {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// Distinguishes "field omitted" (`None`) from "field set to null"
/// (`Some(None)`) in partial updates.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn require_non_blank(field: &str, value: &str) -> Result<(), TrackerError> {
    if value.trim().is_empty() {
        return Err(TrackerError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserCreate {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub password: String,
}

impl UserCreate {
    pub fn validate(&self) -> Result<(), TrackerError> {
        require_non_blank("email", &self.email)?;
        if !self.email.contains('@') {
            return Err(TrackerError::Validation(
                "email must be a valid email address".to_string(),
            ));
        }
        if self.password.is_empty() {
            return Err(TrackerError::Validation("password must not be empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectCreate {
    pub name: String,
    pub key: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl ProjectCreate {
    pub fn validate(&self) -> Result<(), TrackerError> {
        require_non_blank("name", &self.name)?;
        require_non_blank("key", &self.key)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

impl ProjectUpdate {
    pub fn validate(&self) -> Result<(), TrackerError> {
        if let Some(name) = &self.name {
            require_non_blank("name", name)?;
        }
        if let Some(key) = &self.key {
            require_non_blank("key", key)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.key.is_none() && self.description.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMemberCreate {
    pub user_id: UserId,
    #[serde(default)]
    pub role: ProjectRole,
}

/// New issue payload. A `reporter_id` in the request body is ignored: the
/// reporter is always the authenticated caller.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueCreate {
    pub project_id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: IssueStatus,
    #[serde(default)]
    pub priority: IssuePriority,
    #[serde(default)]
    pub assignee_id: Option<UserId>,
}

impl IssueCreate {
    pub fn validate(&self) -> Result<(), TrackerError> {
        require_non_blank("title", &self.title)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<IssueStatus>,
    #[serde(default)]
    pub priority: Option<IssuePriority>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee_id: Option<Option<UserId>>,
}

impl IssueUpdate {
    pub fn validate(&self) -> Result<(), TrackerError> {
        if let Some(title) = &self.title {
            require_non_blank("title", title)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assignee_id.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentCreate {
    pub body: String,
}

impl CommentCreate {
    pub fn validate(&self) -> Result<(), TrackerError> {
        require_non_blank("body", &self.body)
    }
}

/// Optional filters for issue listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueFilter {
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default)]
    pub status: Option<IssueStatus>,
    #[serde(default)]
    pub priority: Option<IssuePriority>,
    #[serde(default)]
    pub assignee_id: Option<UserId>,
}

/// `skip`/`limit` window for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: u32,
    pub limit: u32,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 100;
    pub const DEFAULT_USER_LIMIT: u32 = 10;

    pub fn new(skip: u32, limit: u32) -> Self {
        Self { skip, limit }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_LIMIT)
    }
}
