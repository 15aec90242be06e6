//! Row shapes as stored in SurrealDB and their conversion to domain types.
//!
//! Every `SELECT` projects `record::id(id) AS id` so rows carry the bare
//! record key rather than a `table:key` record id. Enumerations and
//! timestamps are stored as strings and parsed on the way out.

use anyhow::{anyhow, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Comment, Issue, Project, ProjectMember, User};

/// Projection used by every user query.
pub const USER_FIELDS: &str =
    "record::id(id) AS id, email, name, password_hash, role, created_at";
pub const PROJECT_FIELDS: &str =
    "record::id(id) AS id, name, short_key, description, created_at";
pub const MEMBER_FIELDS: &str = "record::id(id) AS id, project_id, user_id, role";
pub const ISSUE_FIELDS: &str = "record::id(id) AS id, project_id, title, description, \
     status, priority, reporter_id, assignee_id, created_at, updated_at";
pub const COMMENT_FIELDS: &str = "record::id(id) AS id, issue_id, author_id, body, created_at";

/// Current time in the storage format.
pub fn now_timestamp() -> String {
    format_timestamp(&Utc::now())
}

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| anyhow!("invalid stored timestamp '{}': {}", raw, e))
}

fn parse_enum<T: std::str::FromStr<Err = String>>(raw: &str) -> Result<T> {
    raw.parse::<T>().map_err(|e| anyhow!(e))
}

/// Persisted user, including the credential hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub role: String,
    pub created_at: String,
}

impl UserRecord {
    /// Public view, dropping the password hash.
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: self.id.into(),
            email: self.email,
            name: self.name,
            role: parse_enum(&self.role)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    pub short_key: String,
    pub description: Option<String>,
    pub created_at: String,
}

impl TryFrom<ProjectRecord> for Project {
    type Error = anyhow::Error;

    fn try_from(record: ProjectRecord) -> Result<Self> {
        Ok(Self {
            id: record.id.into(),
            name: record.name,
            key: record.short_key,
            description: record.description,
            created_at: parse_timestamp(&record.created_at)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMemberRecord {
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    pub role: String,
}

impl TryFrom<ProjectMemberRecord> for ProjectMember {
    type Error = anyhow::Error;

    fn try_from(record: ProjectMemberRecord) -> Result<Self> {
        Ok(Self {
            id: record.id.into(),
            project_id: record.project_id.into(),
            user_id: record.user_id.into(),
            role: parse_enum(&record.role)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRecord {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub reporter_id: String,
    pub assignee_id: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl TryFrom<IssueRecord> for Issue {
    type Error = anyhow::Error;

    fn try_from(record: IssueRecord) -> Result<Self> {
        Ok(Self {
            id: record.id.into(),
            project_id: record.project_id.into(),
            title: record.title,
            description: record.description,
            status: parse_enum(&record.status)?,
            priority: parse_enum(&record.priority)?,
            reporter_id: record.reporter_id.into(),
            assignee_id: record.assignee_id.map(Into::into),
            created_at: parse_timestamp(&record.created_at)?,
            updated_at: record
                .updated_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,
    pub issue_id: String,
    pub author_id: String,
    pub body: String,
    pub created_at: String,
}

impl TryFrom<CommentRecord> for Comment {
    type Error = anyhow::Error;

    fn try_from(record: CommentRecord) -> Result<Self> {
        Ok(Self {
            id: record.id.into(),
            issue_id: record.issue_id.into(),
            author_id: record.author_id.into(),
            body: record.body,
            created_at: parse_timestamp(&record.created_at)?,
        })
    }
}

/// Convert a batch of rows, failing on the first malformed one.
pub fn convert_all<R, T>(records: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = anyhow::Error>,
{
    records.into_iter().map(T::try_from).collect()
}
