use tracing::info;

use crate::auth::Principal;
use crate::db::QueryBuilder;
use crate::error::TrackerResult;
use crate::model::{Comment, CommentCreate, Page};
use crate::policy::Action;
use crate::types::IssueId;

use super::Tracker;

impl Tracker {
    pub async fn list_comments(
        &self,
        principal: &Principal,
        issue_id: &IssueId,
        page: Page,
    ) -> TrackerResult<Vec<Comment>> {
        let issue = self.require_issue(issue_id).await?;
        let membership = self.membership_of(principal, &issue.project_id).await?;
        self.check(principal, membership.as_ref(), Action::ReadComments)?;

        Ok(QueryBuilder::list_comments(&self.db, issue_id, page).await?)
    }

    /// Comment on an issue. The author is always the caller.
    pub async fn create_comment(
        &self,
        principal: &Principal,
        issue_id: &IssueId,
        data: &CommentCreate,
    ) -> TrackerResult<Comment> {
        data.validate()?;

        let issue = self.require_issue(issue_id).await?;
        let membership = self.membership_of(principal, &issue.project_id).await?;
        self.check(principal, membership.as_ref(), Action::CreateComment)?;

        let comment =
            QueryBuilder::create_comment(&self.db, issue_id, principal.user_id(), data).await?;
        info!("Comment {} added to issue {}", comment.id, issue_id);
        Ok(comment)
    }
}
