use tracing::info;

use crate::auth::Principal;
use crate::db::QueryBuilder;
use crate::error::TrackerResult;
use crate::model::{Issue, IssueCreate, IssueFilter, IssueList, IssueUpdate, Page};
use crate::policy::Action;
use crate::types::IssueId;

use super::Tracker;

impl Tracker {
    /// List issues. With a `project_id` filter the caller must be a member of
    /// that project; without one the listing spans every project the caller
    /// belongs to.
    pub async fn list_issues(
        &self,
        principal: &Principal,
        filter: &IssueFilter,
        page: Page,
    ) -> TrackerResult<IssueList> {
        let project_ids = match &filter.project_id {
            Some(project_id) => {
                self.authorize_in_project(principal, project_id, Action::ReadIssues)
                    .await?;
                vec![project_id.to_string()]
            }
            None => QueryBuilder::member_project_ids(&self.db, principal.user_id()).await?,
        };

        let (items, total) = QueryBuilder::list_issues(&self.db, project_ids, filter, page).await?;
        Ok(IssueList {
            items,
            total,
            skip: page.skip,
            limit: page.limit,
        })
    }

    /// File an issue. The reporter is always the caller.
    pub async fn create_issue(
        &self,
        principal: &Principal,
        data: &IssueCreate,
    ) -> TrackerResult<Issue> {
        data.validate()?;
        self.authorize_in_project(principal, &data.project_id, Action::CreateIssue)
            .await?;
        if let Some(assignee_id) = &data.assignee_id {
            self.require_user(assignee_id).await?;
        }

        let issue = QueryBuilder::create_issue(&self.db, data, principal.user_id()).await?;
        info!("Created issue {} in project {}", issue.id, issue.project_id);
        Ok(issue)
    }

    pub async fn get_issue(&self, principal: &Principal, issue_id: &IssueId) -> TrackerResult<Issue> {
        let issue = self.require_issue(issue_id).await?;
        let membership = self.membership_of(principal, &issue.project_id).await?;
        self.check(principal, membership.as_ref(), Action::ReadIssue)?;
        Ok(issue)
    }

    /// Apply a partial update. Allowed for project maintainers and the
    /// issue's reporter.
    pub async fn update_issue(
        &self,
        principal: &Principal,
        issue_id: &IssueId,
        update: &IssueUpdate,
    ) -> TrackerResult<Issue> {
        update.validate()?;

        let issue = self.require_issue(issue_id).await?;
        let membership = self.membership_of(principal, &issue.project_id).await?;
        self.check(
            principal,
            membership.as_ref(),
            Action::UpdateIssue {
                reporter_id: &issue.reporter_id,
            },
        )?;

        if update.is_empty() {
            return Ok(issue);
        }
        if let Some(Some(assignee_id)) = &update.assignee_id {
            self.require_user(assignee_id).await?;
        }

        let updated = QueryBuilder::update_issue(&self.db, issue_id, update).await?;
        info!("Updated issue {} (status {})", updated.id, updated.status);
        Ok(updated)
    }
}
