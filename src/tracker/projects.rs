use tracing::info;

use crate::auth::Principal;
use crate::db::{QueryBuilder, WriteOutcome};
use crate::error::{TrackerError, TrackerResult};
use crate::model::{
    MemberWithUser, Page, Project, ProjectCreate, ProjectMember, ProjectMemberCreate,
    ProjectUpdate,
};
use crate::policy::{Action, ConflictReason};
use crate::types::ProjectId;

use super::Tracker;

impl Tracker {
    /// Projects the caller is a member of.
    pub async fn list_projects(
        &self,
        principal: &Principal,
        page: Page,
    ) -> TrackerResult<Vec<Project>> {
        Ok(QueryBuilder::list_projects_for_user(&self.db, principal.user_id(), page).await?)
    }

    /// Create a project with the caller as its only maintainer.
    pub async fn create_project(
        &self,
        principal: &Principal,
        data: &ProjectCreate,
    ) -> TrackerResult<Project> {
        data.validate()?;

        let key_in_use = QueryBuilder::project_key_in_use(&self.db, &data.key, None).await?;
        self.check(principal, None, Action::CreateProject { key_in_use })?;

        match QueryBuilder::create_project_with_maintainer(&self.db, data, principal.user_id())
            .await?
        {
            WriteOutcome::Written(project) => {
                info!(
                    "Created project {} ({}) for {}",
                    project.key,
                    project.id,
                    principal.display_name()
                );
                Ok(project)
            }
            WriteOutcome::Duplicate => Err(TrackerError::Conflict(ConflictReason::DuplicateKey)),
        }
    }

    pub async fn get_project(
        &self,
        principal: &Principal,
        project_id: &ProjectId,
    ) -> TrackerResult<Project> {
        let (project, _) = self
            .authorize_in_project(principal, project_id, Action::ReadProject)
            .await?;
        Ok(project)
    }

    /// Apply a partial update. Maintainers only.
    pub async fn update_project(
        &self,
        principal: &Principal,
        project_id: &ProjectId,
        update: &ProjectUpdate,
    ) -> TrackerResult<Project> {
        update.validate()?;

        let project = self.require_project(project_id).await?;
        let membership = self.membership_of(principal, project_id).await?;

        let key_in_use = match &update.key {
            Some(key) if key != &project.key => {
                QueryBuilder::project_key_in_use(&self.db, key, Some(project_id)).await?
            }
            _ => false,
        };
        self.check(
            principal,
            membership.as_ref(),
            Action::UpdateProject { key_in_use },
        )?;

        if update.is_empty() {
            return Ok(project);
        }

        match QueryBuilder::update_project(&self.db, project_id, update).await? {
            WriteOutcome::Written(project) => {
                info!("Updated project {}", project.id);
                Ok(project)
            }
            WriteOutcome::Duplicate => Err(TrackerError::Conflict(ConflictReason::DuplicateKey)),
        }
    }

    /// Enroll a user in a project. Maintainers only; a user can hold at most
    /// one membership per project.
    pub async fn add_member(
        &self,
        principal: &Principal,
        project_id: &ProjectId,
        data: &ProjectMemberCreate,
    ) -> TrackerResult<ProjectMember> {
        self.require_project(project_id).await?;
        let membership = self.membership_of(principal, project_id).await?;
        let target_membership =
            QueryBuilder::find_membership(&self.db, project_id, &data.user_id).await?;

        self.check(
            principal,
            membership.as_ref(),
            Action::AddMember {
                target_membership: target_membership.as_ref(),
            },
        )?;

        self.require_user(&data.user_id).await?;

        match QueryBuilder::insert_membership(&self.db, project_id, &data.user_id, data.role)
            .await?
        {
            WriteOutcome::Written(member) => {
                info!(
                    "Added {} to project {} as {}",
                    member.user_id, project_id, member.role
                );
                Ok(member)
            }
            WriteOutcome::Duplicate => Err(TrackerError::Conflict(ConflictReason::AlreadyMember)),
        }
    }

    pub async fn list_members(
        &self,
        principal: &Principal,
        project_id: &ProjectId,
    ) -> TrackerResult<Vec<MemberWithUser>> {
        self.authorize_in_project(principal, project_id, Action::ListMembers)
            .await?;
        Ok(QueryBuilder::list_members(&self.db, project_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::QueryBuilder;
    use crate::error::{Resource, TrackerError};
    use crate::model::{GlobalRole, Page, ProjectCreate, ProjectMemberCreate, ProjectRole, ProjectUpdate};
    use crate::policy::{ConflictReason, ForbiddenReason};
    use crate::tracker::test_support::*;
    use crate::types::{ProjectId, UserId};

    fn add(user_id: &UserId, role: ProjectRole) -> ProjectMemberCreate {
        ProjectMemberCreate {
            user_id: user_id.clone(),
            role,
        }
    }

    #[tokio::test]
    async fn test_creator_is_sole_maintainer() {
        let tracker = setup_tracker().await;
        let alice = principal(&tracker, "alice@example.com").await;
        let created = project(&tracker, &alice, "CORE").await;

        let members = tracker.list_members(&alice, &created.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(&members[0].member.user_id, alice.user_id());
        assert_eq!(members[0].member.role, ProjectRole::Maintainer);
    }

    #[tokio::test]
    async fn test_duplicate_key_on_create() {
        let tracker = setup_tracker().await;
        let alice = principal(&tracker, "alice@example.com").await;
        project(&tracker, &alice, "CORE").await;

        let err = tracker
            .create_project(
                &alice,
                &ProjectCreate {
                    name: "Again".to_string(),
                    key: "CORE".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::Conflict(ConflictReason::DuplicateKey)));
    }

    #[tokio::test]
    async fn test_listing_is_membership_filtered() {
        let tracker = setup_tracker().await;
        let alice = principal(&tracker, "alice@example.com").await;
        let bob = principal(&tracker, "bob@example.com").await;
        project(&tracker, &alice, "CORE").await;
        project(&tracker, &bob, "WEB").await;

        let visible = tracker.list_projects(&alice, Page::default()).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].key, "CORE");
    }

    #[tokio::test]
    async fn test_non_member_cannot_read() {
        let tracker = setup_tracker().await;
        let alice = principal(&tracker, "alice@example.com").await;
        let mallory = principal(&tracker, "mallory@example.com").await;
        let created = project(&tracker, &alice, "CORE").await;

        let err = tracker.get_project(&mallory, &created.id).await.unwrap_err();
        assert!(matches!(err, TrackerError::Forbidden(ForbiddenReason::NotAMember)));

        let err = tracker.list_members(&mallory, &created.id).await.unwrap_err();
        assert!(matches!(err, TrackerError::Forbidden(ForbiddenReason::NotAMember)));
    }

    #[tokio::test]
    async fn test_unknown_project_is_not_found() {
        let tracker = setup_tracker().await;
        let alice = principal(&tracker, "alice@example.com").await;

        let err = tracker
            .get_project(&alice, &ProjectId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(Resource::Project)));
    }

    #[tokio::test]
    async fn test_update_requires_maintainer() {
        let tracker = setup_tracker().await;
        let alice = principal(&tracker, "alice@example.com").await;
        let bob = principal(&tracker, "bob@example.com").await;
        let created = project(&tracker, &alice, "CORE").await;
        tracker
            .add_member(&alice, &created.id, &add(bob.user_id(), ProjectRole::Member))
            .await
            .unwrap();

        let rename = ProjectUpdate {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        let err = tracker
            .update_project(&bob, &created.id, &rename)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Forbidden(ForbiddenReason::MaintainerRequired)
        ));

        let updated = tracker
            .update_project(&alice, &created.id, &rename)
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.key, "CORE");
    }

    #[tokio::test]
    async fn test_update_to_taken_key_conflicts() {
        let tracker = setup_tracker().await;
        let alice = principal(&tracker, "alice@example.com").await;
        let core = project(&tracker, &alice, "CORE").await;
        project(&tracker, &alice, "WEB").await;

        let rekey = ProjectUpdate {
            key: Some("WEB".to_string()),
            ..Default::default()
        };
        let err = tracker
            .update_project(&alice, &core.id, &rekey)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::Conflict(ConflictReason::DuplicateKey)));

        // Re-submitting the current key is not a collision.
        let same = ProjectUpdate {
            key: Some("CORE".to_string()),
            ..Default::default()
        };
        assert!(tracker.update_project(&alice, &core.id, &same).await.is_ok());
    }

    #[tokio::test]
    async fn test_add_member_rules() {
        let tracker = setup_tracker().await;
        let alice = principal(&tracker, "alice@example.com").await;
        let bob = principal(&tracker, "bob@example.com").await;
        let carol = principal(&tracker, "carol@example.com").await;
        let created = project(&tracker, &alice, "CORE").await;

        tracker
            .add_member(&alice, &created.id, &add(bob.user_id(), ProjectRole::Member))
            .await
            .unwrap();

        // Members cannot enroll others.
        let err = tracker
            .add_member(&bob, &created.id, &add(carol.user_id(), ProjectRole::Member))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Forbidden(ForbiddenReason::MaintainerRequired)
        ));

        // Twice is a conflict and the row count stays at one.
        let err = tracker
            .add_member(&alice, &created.id, &add(bob.user_id(), ProjectRole::Member))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::Conflict(ConflictReason::AlreadyMember)));
        assert_eq!(
            QueryBuilder::count_memberships(tracker.db(), &created.id, bob.user_id())
                .await
                .unwrap(),
            1
        );

        let err = tracker
            .add_member(&alice, &created.id, &add(&UserId::generate(), ProjectRole::Member))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(Resource::User)));
    }

    #[tokio::test]
    async fn test_global_maintainer_has_no_project_rights() {
        let tracker = setup_tracker().await;
        let alice = principal(&tracker, "alice@example.com").await;
        let admin = principal_with_role(&tracker, "admin@example.com", GlobalRole::Maintainer).await;
        let created = project(&tracker, &alice, "CORE").await;

        let err = tracker.get_project(&admin, &created.id).await.unwrap_err();
        assert!(matches!(err, TrackerError::Forbidden(ForbiddenReason::NotAMember)));
    }
}
