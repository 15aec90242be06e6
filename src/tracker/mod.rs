//! Resource services for users, projects, issues and comments.
//!
//! Every project-scoped operation follows the same shape: load the target
//! record (404 if absent), load the caller's membership in its project, ask
//! [`authorize`](crate::policy::authorize) for a decision, then touch the
//! store. Nothing is cached between calls.

mod comments;
mod issues;
mod projects;
mod users;

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::auth::{Principal, UserStore};
use crate::db::{create_connection, ensure_schema, DatabaseConfig, Db, QueryBuilder};
use crate::error::{Resource, TrackerError, TrackerResult};
use crate::model::{Issue, Project, ProjectMember};
use crate::policy::{authorize, Action};
use crate::types::{IssueId, ProjectId, UserId};

/// Entry point for all tracker operations.
#[derive(Clone)]
pub struct Tracker {
    db: Db,
    users: Arc<UserStore>,
}

impl Tracker {
    pub fn new(db: Db) -> Self {
        Self {
            users: Arc::new(UserStore::new(db.clone())),
            db,
        }
    }

    /// Connect to the configured database and make sure the schema exists.
    pub async fn connect(config: DatabaseConfig) -> Result<Self> {
        let db = create_connection(config).await?;
        ensure_schema(&db).await?;
        Ok(Self::new(db))
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn user_store(&self) -> &Arc<UserStore> {
        &self.users
    }

    async fn require_project(&self, project_id: &ProjectId) -> TrackerResult<Project> {
        QueryBuilder::find_project(&self.db, project_id)
            .await?
            .ok_or(TrackerError::NotFound(Resource::Project))
    }

    async fn require_issue(&self, issue_id: &IssueId) -> TrackerResult<Issue> {
        QueryBuilder::find_issue(&self.db, issue_id)
            .await?
            .ok_or(TrackerError::NotFound(Resource::Issue))
    }

    async fn require_user(&self, user_id: &UserId) -> TrackerResult<()> {
        match self.users.get_user_by_id(user_id).await? {
            Some(_) => Ok(()),
            None => Err(TrackerError::NotFound(Resource::User)),
        }
    }

    async fn membership_of(
        &self,
        principal: &Principal,
        project_id: &ProjectId,
    ) -> TrackerResult<Option<ProjectMember>> {
        Ok(QueryBuilder::find_membership(&self.db, project_id, principal.user_id()).await?)
    }

    /// Run the authorization engine and log refusals.
    fn check(
        &self,
        principal: &Principal,
        membership: Option<&ProjectMember>,
        action: Action<'_>,
    ) -> TrackerResult<()> {
        let decision = authorize(principal, membership, action);
        if !decision.is_allowed() {
            debug!(
                "Denied {} for {}: {:?}",
                action.name(),
                principal.user_id(),
                decision
            );
        }
        decision.into_result()
    }

    /// Load a project, the caller's membership in it, and authorize `action`.
    async fn authorize_in_project(
        &self,
        principal: &Principal,
        project_id: &ProjectId,
        action: Action<'_>,
    ) -> TrackerResult<(Project, Option<ProjectMember>)> {
        let project = self.require_project(project_id).await?;
        let membership = self.membership_of(principal, project_id).await?;
        self.check(principal, membership.as_ref(), action)?;
        Ok((project, membership))
    }
}
