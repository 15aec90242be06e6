// Database query helpers for SurrealDB.
//
// Records are keyed by service-generated ids (`type::thing(table, $id)`), and
// every read projects the bare key back out through the `*_FIELDS` constants.
// Uniqueness of emails, project keys and memberships is enforced by unique
// indexes; a violation comes back as `WriteOutcome::Duplicate`.

use std::collections::HashMap;
use std::future::Future;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use surrealdb::Response;
use tracing::debug;

use crate::db::schema::*;
use crate::db::Db;
use crate::model::{
    Comment, CommentCreate, Issue, IssueCreate, IssueFilter, IssueUpdate, MemberWithUser, Page,
    Project, ProjectCreate, ProjectMember, ProjectRole, ProjectUpdate,
};
use crate::types::{CommentId, IssueId, MembershipId, ProjectId, UserId};

/// Result of a write guarded by a unique index.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome<T> {
    Written(T),
    /// The named unique index already held the value.
    Duplicate,
}

impl<T> WriteOutcome<T> {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate)
    }
}

pub const USER_EMAIL_INDEX: &str = "user_email";
pub const PROJECT_KEY_INDEX: &str = "project_short_key";
pub const MEMBERSHIP_INDEX: &str = "project_member_unique";

#[derive(Debug, Deserialize)]
struct CountRow {
    total: u64,
}

fn is_unique_violation(message: &str, index: &str) -> bool {
    message.contains(index) && message.contains("already contains")
}

/// Drain statement errors from a response.
///
/// Returns `Ok(true)` when one of them is a violation of `index`, `Ok(false)`
/// when every statement succeeded, and an error for anything else. Inside a
/// transaction the other statements report "not executed", so a single
/// violation anywhere marks the whole write as a duplicate.
pub fn take_unique_violation(response: &mut Response, index: &str) -> Result<bool> {
    let errors: HashMap<usize, surrealdb::Error> = response.take_errors();
    if errors.is_empty() {
        return Ok(false);
    }

    if errors
        .values()
        .any(|e| is_unique_violation(&e.to_string(), index))
    {
        return Ok(true);
    }

    let mut messages: Vec<(usize, String)> =
        errors.into_iter().map(|(i, e)| (i, e.to_string())).collect();
    messages.sort_by_key(|(i, _)| *i);
    let joined = messages
        .into_iter()
        .map(|(_, m)| m)
        .collect::<Vec<_>>()
        .join("; ");
    Err(anyhow!(joined))
}

/// Attempts made for a unique-guarded write that keeps hitting transaction
/// conflicts.
const MAX_WRITE_ATTEMPTS: u32 = 3;

fn is_retryable(message: &str) -> bool {
    message.contains("can be retried") || message.contains("Transaction conflict")
}

/// Run a write guarded by `index`, retrying on optimistic transaction
/// conflicts. Returns `Ok(true)` when the index rejected the write.
///
/// Concurrent writers of the same unique value can collide in the storage
/// engine before the index check runs; the retry then observes the winner's
/// entry and reports a clean duplicate.
pub async fn write_unique<F, Fut>(index: &str, mut run: F) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Response>>,
{
    let mut attempt = 1;
    loop {
        let outcome = match run().await {
            Ok(mut response) => take_unique_violation(&mut response, index),
            Err(e) => Err(e),
        };

        match outcome {
            Err(e) if attempt < MAX_WRITE_ATTEMPTS && is_retryable(&e.to_string()) => {
                debug!("Retrying write guarded by {} after conflict: {}", index, e);
                attempt += 1;
            }
            other => return other,
        }
    }
}

fn page_clause() -> &'static str {
    "LIMIT $limit START $skip"
}

pub struct QueryBuilder;

impl QueryBuilder {
    // ---------------------------------------------------------------------
    // Projects
    // ---------------------------------------------------------------------

    pub async fn find_project(db: &Db, project_id: &ProjectId) -> Result<Option<Project>> {
        let query = format!(
            "SELECT {} FROM type::thing('project', $id)",
            PROJECT_FIELDS
        );

        let mut res = db
            .query(query)
            .bind(("id", project_id.to_string()))
            .await?;

        let rows: Vec<ProjectRecord> = res.take(0)?;
        rows.into_iter().next().map(Project::try_from).transpose()
    }

    /// Whether a project other than `excluding` already uses `key`.
    pub async fn project_key_in_use(
        db: &Db,
        key: &str,
        excluding: Option<&ProjectId>,
    ) -> Result<bool> {
        let query = r#"
            SELECT count() AS total FROM project
            WHERE short_key = $key AND record::id(id) != $excluding
            GROUP ALL
        "#;

        let mut res = db
            .query(query)
            .bind(("key", key.to_string()))
            .bind(("excluding", excluding.map(|p| p.to_string()).unwrap_or_default()))
            .await?;

        let row: Option<CountRow> = res.take(0)?;
        Ok(row.map(|r| r.total).unwrap_or(0) > 0)
    }

    /// Create a project and enroll `creator` as its maintainer in one
    /// transaction. Neither row exists if either write fails.
    pub async fn create_project_with_maintainer(
        db: &Db,
        data: &ProjectCreate,
        creator: &UserId,
    ) -> Result<WriteOutcome<Project>> {
        let project_id = ProjectId::generate();
        let member_id = MembershipId::generate();

        let query = r#"
            BEGIN TRANSACTION;
            CREATE type::thing('project', $project_id) CONTENT {
                name: $name,
                short_key: $key,
                description: $description,
                created_at: $created_at
            } RETURN NONE;
            CREATE type::thing('project_member', $member_id) CONTENT {
                project_id: $project_id,
                user_id: $user_id,
                role: $role
            } RETURN NONE;
            COMMIT TRANSACTION;
        "#;

        let created_at = now_timestamp();
        let duplicate = write_unique(PROJECT_KEY_INDEX, || {
            let pending = db
                .query(query)
                .bind(("project_id", project_id.to_string()))
                .bind(("member_id", member_id.to_string()))
                .bind(("name", data.name.clone()))
                .bind(("key", data.key.clone()))
                .bind(("description", data.description.clone()))
                .bind(("created_at", created_at.clone()))
                .bind(("user_id", creator.to_string()))
                .bind(("role", ProjectRole::Maintainer.as_str()));
            async move { pending.await.map_err(anyhow::Error::from) }
        })
        .await?;

        if duplicate {
            return Ok(WriteOutcome::Duplicate);
        }

        let project = Self::find_project(db, &project_id)
            .await?
            .ok_or_else(|| anyhow!("project {} missing after create", project_id))?;
        Ok(WriteOutcome::Written(project))
    }

    /// Apply the supplied fields of `update`. Omitted fields are untouched.
    pub async fn update_project(
        db: &Db,
        project_id: &ProjectId,
        update: &ProjectUpdate,
    ) -> Result<WriteOutcome<Project>> {
        let mut sets: Vec<&str> = Vec::new();
        if update.name.is_some() {
            sets.push("name = $name");
        }
        if update.key.is_some() {
            sets.push("short_key = $key");
        }
        match &update.description {
            Some(Some(_)) => sets.push("description = $description"),
            Some(None) => sets.push("description = NONE"),
            None => {}
        }

        if !sets.is_empty() {
            let query = format!(
                "UPDATE type::thing('project', $id) SET {} RETURN NONE",
                sets.join(", ")
            );

            let mut q = db.query(query).bind(("id", project_id.to_string()));
            if let Some(name) = &update.name {
                q = q.bind(("name", name.clone()));
            }
            if let Some(key) = &update.key {
                q = q.bind(("key", key.clone()));
            }
            if let Some(Some(description)) = &update.description {
                q = q.bind(("description", description.clone()));
            }

            let mut res = q.await?;
            if take_unique_violation(&mut res, PROJECT_KEY_INDEX)? {
                return Ok(WriteOutcome::Duplicate);
            }
        }

        let project = Self::find_project(db, project_id)
            .await?
            .ok_or_else(|| anyhow!("project {} missing after update", project_id))?;
        Ok(WriteOutcome::Written(project))
    }

    /// Projects the user holds a membership in, oldest first.
    pub async fn list_projects_for_user(
        db: &Db,
        user_id: &UserId,
        page: Page,
    ) -> Result<Vec<Project>> {
        let project_ids = Self::member_project_ids(db, user_id).await?;
        if project_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT {} FROM project WHERE record::id(id) IN $ids \
             ORDER BY created_at ASC {}",
            PROJECT_FIELDS,
            page_clause()
        );

        let mut res = db
            .query(query)
            .bind(("ids", project_ids))
            .bind(("limit", page.limit))
            .bind(("skip", page.skip))
            .await?;

        let rows: Vec<ProjectRecord> = res.take(0)?;
        convert_all(rows)
    }

    // ---------------------------------------------------------------------
    // Memberships
    // ---------------------------------------------------------------------

    pub async fn find_membership(
        db: &Db,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> Result<Option<ProjectMember>> {
        let query = format!(
            "SELECT {} FROM project_member \
             WHERE project_id = $project_id AND user_id = $user_id LIMIT 1",
            MEMBER_FIELDS
        );

        let mut res = db
            .query(query)
            .bind(("project_id", project_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await?;

        let rows: Vec<ProjectMemberRecord> = res.take(0)?;
        rows.into_iter()
            .next()
            .map(ProjectMember::try_from)
            .transpose()
    }

    pub async fn insert_membership(
        db: &Db,
        project_id: &ProjectId,
        user_id: &UserId,
        role: ProjectRole,
    ) -> Result<WriteOutcome<ProjectMember>> {
        let member_id = MembershipId::generate();

        let query = r#"
            CREATE type::thing('project_member', $id) CONTENT {
                project_id: $project_id,
                user_id: $user_id,
                role: $role
            } RETURN NONE
        "#;

        let duplicate = write_unique(MEMBERSHIP_INDEX, || {
            let pending = db
                .query(query)
                .bind(("id", member_id.to_string()))
                .bind(("project_id", project_id.to_string()))
                .bind(("user_id", user_id.to_string()))
                .bind(("role", role.as_str()));
            async move { pending.await.map_err(anyhow::Error::from) }
        })
        .await?;

        if duplicate {
            return Ok(WriteOutcome::Duplicate);
        }

        Ok(WriteOutcome::Written(ProjectMember {
            id: member_id,
            project_id: project_id.clone(),
            user_id: user_id.clone(),
            role,
        }))
    }

    /// Members of a project joined with their public user records.
    pub async fn list_members(db: &Db, project_id: &ProjectId) -> Result<Vec<MemberWithUser>> {
        let query = format!(
            "SELECT {} FROM project_member WHERE project_id = $project_id;
             SELECT {} FROM user WHERE record::id(id) IN (
                 SELECT VALUE user_id FROM project_member WHERE project_id = $project_id
             );",
            MEMBER_FIELDS, USER_FIELDS
        );

        let mut res = db
            .query(query)
            .bind(("project_id", project_id.to_string()))
            .await?;

        let members: Vec<ProjectMemberRecord> = res.take(0)?;
        let users: Vec<UserRecord> = res.take(1)?;

        let mut users_by_id = HashMap::new();
        for record in users {
            let user = record.into_user()?;
            users_by_id.insert(user.id.clone(), user);
        }

        let mut joined = Vec::with_capacity(members.len());
        for record in members {
            let member = ProjectMember::try_from(record)?;
            let user = users_by_id
                .get(&member.user_id)
                .cloned()
                .ok_or_else(|| anyhow!("membership {} references a missing user", member.id))?;
            joined.push(MemberWithUser { member, user });
        }
        Ok(joined)
    }

    /// Number of membership rows for the pair. Always 0 or 1 while the
    /// unique index is in place.
    pub async fn count_memberships(
        db: &Db,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> Result<u64> {
        let query = r#"
            SELECT count() AS total FROM project_member
            WHERE project_id = $project_id AND user_id = $user_id
            GROUP ALL
        "#;

        let mut res = db
            .query(query)
            .bind(("project_id", project_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await?;

        let row: Option<CountRow> = res.take(0)?;
        Ok(row.map(|r| r.total).unwrap_or(0))
    }

    pub async fn member_project_ids(db: &Db, user_id: &UserId) -> Result<Vec<String>> {
        let mut res = db
            .query("SELECT VALUE project_id FROM project_member WHERE user_id = $user_id")
            .bind(("user_id", user_id.to_string()))
            .await?;

        let ids: Vec<String> = res.take(0)?;
        Ok(ids)
    }

    // ---------------------------------------------------------------------
    // Issues
    // ---------------------------------------------------------------------

    pub async fn create_issue(db: &Db, data: &IssueCreate, reporter: &UserId) -> Result<Issue> {
        let issue_id = IssueId::generate();

        let query = r#"
            CREATE type::thing('issue', $id) CONTENT {
                project_id: $project_id,
                title: $title,
                description: $description,
                status: $status,
                priority: $priority,
                reporter_id: $reporter_id,
                assignee_id: $assignee_id,
                created_at: $created_at
            } RETURN NONE
        "#;

        db.query(query)
            .bind(("id", issue_id.to_string()))
            .bind(("project_id", data.project_id.to_string()))
            .bind(("title", data.title.clone()))
            .bind(("description", data.description.clone()))
            .bind(("status", data.status.as_str()))
            .bind(("priority", data.priority.as_str()))
            .bind(("reporter_id", reporter.to_string()))
            .bind(("assignee_id", data.assignee_id.as_ref().map(|a| a.to_string())))
            .bind(("created_at", now_timestamp()))
            .await?
            .check()?;

        Self::find_issue(db, &issue_id)
            .await?
            .ok_or_else(|| anyhow!("issue {} missing after create", issue_id))
    }

    pub async fn find_issue(db: &Db, issue_id: &IssueId) -> Result<Option<Issue>> {
        let query = format!("SELECT {} FROM type::thing('issue', $id)", ISSUE_FIELDS);

        let mut res = db.query(query).bind(("id", issue_id.to_string())).await?;

        let rows: Vec<IssueRecord> = res.take(0)?;
        rows.into_iter().next().map(Issue::try_from).transpose()
    }

    /// Issues within `project_ids` matching `filter`, plus the total count
    /// before pagination.
    pub async fn list_issues(
        db: &Db,
        project_ids: Vec<String>,
        filter: &IssueFilter,
        page: Page,
    ) -> Result<(Vec<Issue>, u64)> {
        if project_ids.is_empty() {
            return Ok((Vec::new(), 0));
        }

        let mut conditions = vec!["project_id IN $project_ids"];
        if filter.status.is_some() {
            conditions.push("status = $status");
        }
        if filter.priority.is_some() {
            conditions.push("priority = $priority");
        }
        if filter.assignee_id.is_some() {
            conditions.push("assignee_id = $assignee_id");
        }
        let where_clause = conditions.join(" AND ");

        let query = format!(
            "SELECT {fields} FROM issue WHERE {cond} ORDER BY created_at ASC {page};
             SELECT count() AS total FROM issue WHERE {cond} GROUP ALL;",
            fields = ISSUE_FIELDS,
            cond = where_clause,
            page = page_clause()
        );

        let mut q = db
            .query(query)
            .bind(("project_ids", project_ids))
            .bind(("limit", page.limit))
            .bind(("skip", page.skip));
        if let Some(status) = filter.status {
            q = q.bind(("status", status.as_str()));
        }
        if let Some(priority) = filter.priority {
            q = q.bind(("priority", priority.as_str()));
        }
        if let Some(assignee) = &filter.assignee_id {
            q = q.bind(("assignee_id", assignee.to_string()));
        }

        let mut res = q.await?;
        let rows: Vec<IssueRecord> = res.take(0)?;
        let count: Option<CountRow> = res.take(1)?;

        Ok((convert_all(rows)?, count.map(|c| c.total).unwrap_or(0)))
    }

    /// Apply the supplied fields of `update` and stamp `updated_at`.
    pub async fn update_issue(db: &Db, issue_id: &IssueId, update: &IssueUpdate) -> Result<Issue> {
        let mut sets: Vec<&str> = vec!["updated_at = $updated_at"];
        if update.title.is_some() {
            sets.push("title = $title");
        }
        match &update.description {
            Some(Some(_)) => sets.push("description = $description"),
            Some(None) => sets.push("description = NONE"),
            None => {}
        }
        if update.status.is_some() {
            sets.push("status = $status");
        }
        if update.priority.is_some() {
            sets.push("priority = $priority");
        }
        match &update.assignee_id {
            Some(Some(_)) => sets.push("assignee_id = $assignee_id"),
            Some(None) => sets.push("assignee_id = NONE"),
            None => {}
        }

        let query = format!(
            "UPDATE type::thing('issue', $id) SET {} RETURN NONE",
            sets.join(", ")
        );

        let mut q = db
            .query(query)
            .bind(("id", issue_id.to_string()))
            .bind(("updated_at", now_timestamp()));
        if let Some(title) = &update.title {
            q = q.bind(("title", title.clone()));
        }
        if let Some(Some(description)) = &update.description {
            q = q.bind(("description", description.clone()));
        }
        if let Some(status) = update.status {
            q = q.bind(("status", status.as_str()));
        }
        if let Some(priority) = update.priority {
            q = q.bind(("priority", priority.as_str()));
        }
        if let Some(Some(assignee)) = &update.assignee_id {
            q = q.bind(("assignee_id", assignee.to_string()));
        }

        q.await?.check()?;

        Self::find_issue(db, issue_id)
            .await?
            .ok_or_else(|| anyhow!("issue {} missing after update", issue_id))
    }

    // ---------------------------------------------------------------------
    // Comments
    // ---------------------------------------------------------------------

    pub async fn create_comment(
        db: &Db,
        issue_id: &IssueId,
        author: &UserId,
        data: &CommentCreate,
    ) -> Result<Comment> {
        let comment_id = CommentId::generate();
        let created_at = now_timestamp();

        let query = r#"
            CREATE type::thing('issue_comment', $id) CONTENT {
                issue_id: $issue_id,
                author_id: $author_id,
                body: $body,
                created_at: $created_at
            } RETURN NONE
        "#;

        db.query(query)
            .bind(("id", comment_id.to_string()))
            .bind(("issue_id", issue_id.to_string()))
            .bind(("author_id", author.to_string()))
            .bind(("body", data.body.clone()))
            .bind(("created_at", created_at.clone()))
            .await?
            .check()?;

        Ok(Comment {
            id: comment_id,
            issue_id: issue_id.clone(),
            author_id: author.clone(),
            body: data.body.clone(),
            created_at: parse_timestamp(&created_at)?,
        })
    }

    /// Comments on an issue, oldest first.
    pub async fn list_comments(db: &Db, issue_id: &IssueId, page: Page) -> Result<Vec<Comment>> {
        let query = format!(
            "SELECT {} FROM issue_comment WHERE issue_id = $issue_id \
             ORDER BY created_at ASC {}",
            COMMENT_FIELDS,
            page_clause()
        );

        let mut res = db
            .query(query)
            .bind(("issue_id", issue_id.to_string()))
            .bind(("limit", page.limit))
            .bind(("skip", page.skip))
            .await?;

        let rows: Vec<CommentRecord> = res.take(0)?;
        convert_all(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_connection, ensure_schema, DatabaseConfig};
    use crate::model::{IssuePriority, IssueStatus};

    async fn setup_test_db() -> Db {
        let db = create_connection(DatabaseConfig::memory()).await.unwrap();
        ensure_schema(&db).await.unwrap();
        db
    }

    async fn insert_user(db: &Db, email: &str) -> UserId {
        let id = UserId::generate();
        db.query(
            "CREATE type::thing('user', $id) CONTENT {
                email: $email, name: NONE, password_hash: 'x',
                role: 'user', created_at: $created_at
            }",
        )
        .bind(("id", id.to_string()))
        .bind(("email", email.to_string()))
        .bind(("created_at", now_timestamp()))
        .await
        .unwrap()
        .check()
        .unwrap();
        id
    }

    fn project_create(key: &str) -> ProjectCreate {
        ProjectCreate {
            name: format!("Project {}", key),
            key: key.to_string(),
            description: Some("demo".to_string()),
        }
    }

    async fn create_project(db: &Db, key: &str, creator: &UserId) -> Project {
        match QueryBuilder::create_project_with_maintainer(db, &project_create(key), creator)
            .await
            .unwrap()
        {
            WriteOutcome::Written(p) => p,
            WriteOutcome::Duplicate => panic!("unexpected duplicate key {}", key),
        }
    }

    #[test]
    fn test_retryable_detection() {
        assert!(is_retryable(
            "Failed to commit transaction due to a read or write conflict. \
             This transaction can be retried"
        ));
        assert!(!is_retryable("Database index `user_email` already contains 'a@b'"));
    }

    #[test]
    fn test_unique_violation_detection() {
        let msg = "Database index `project_member_unique` already contains ['p', 'u'], \
                   with record `project_member:abc`";
        assert!(is_unique_violation(msg, MEMBERSHIP_INDEX));
        assert!(!is_unique_violation(msg, USER_EMAIL_INDEX));
    }

    #[tokio::test]
    async fn test_project_creation_enrolls_creator_as_maintainer() {
        let db = setup_test_db().await;
        let alice = insert_user(&db, "alice@example.com").await;

        let project = create_project(&db, "CORE", &alice).await;
        assert_eq!(project.key, "CORE");
        assert_eq!(project.description.as_deref(), Some("demo"));

        let membership = QueryBuilder::find_membership(&db, &project.id, &alice)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(membership.role, ProjectRole::Maintainer);
        assert_eq!(
            QueryBuilder::count_memberships(&db, &project.id, &alice).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_duplicate_key_writes_nothing() {
        let db = setup_test_db().await;
        let alice = insert_user(&db, "alice@example.com").await;
        let bob = insert_user(&db, "bob@example.com").await;

        create_project(&db, "CORE", &alice).await;
        let outcome =
            QueryBuilder::create_project_with_maintainer(&db, &project_create("CORE"), &bob)
                .await
                .unwrap();
        assert!(outcome.is_duplicate());

        // The failed transaction must not leave a membership behind.
        let projects = QueryBuilder::member_project_ids(&db, &bob).await.unwrap();
        assert!(projects.is_empty());
    }

    #[tokio::test]
    async fn test_key_in_use_excludes_self() {
        let db = setup_test_db().await;
        let alice = insert_user(&db, "alice@example.com").await;
        let project = create_project(&db, "CORE", &alice).await;

        assert!(QueryBuilder::project_key_in_use(&db, "CORE", None).await.unwrap());
        assert!(!QueryBuilder::project_key_in_use(&db, "CORE", Some(&project.id))
            .await
            .unwrap());
        assert!(!QueryBuilder::project_key_in_use(&db, "WEB", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_project_partial() {
        let db = setup_test_db().await;
        let alice = insert_user(&db, "alice@example.com").await;
        let project = create_project(&db, "CORE", &alice).await;

        let update = ProjectUpdate {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        let updated = match QueryBuilder::update_project(&db, &project.id, &update)
            .await
            .unwrap()
        {
            WriteOutcome::Written(p) => p,
            WriteOutcome::Duplicate => panic!("unexpected duplicate"),
        };
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.key, "CORE");
        assert_eq!(updated.description.as_deref(), Some("demo"));

        let clear = ProjectUpdate {
            description: Some(None),
            ..Default::default()
        };
        let WriteOutcome::Written(cleared) =
            QueryBuilder::update_project(&db, &project.id, &clear).await.unwrap()
        else {
            panic!("unexpected duplicate");
        };
        assert!(cleared.description.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_membership_is_rejected_by_index() {
        let db = setup_test_db().await;
        let alice = insert_user(&db, "alice@example.com").await;
        let bob = insert_user(&db, "bob@example.com").await;
        let project = create_project(&db, "CORE", &alice).await;

        let first = QueryBuilder::insert_membership(&db, &project.id, &bob, ProjectRole::Member)
            .await
            .unwrap();
        assert!(!first.is_duplicate());

        let second = QueryBuilder::insert_membership(&db, &project.id, &bob, ProjectRole::Member)
            .await
            .unwrap();
        assert!(second.is_duplicate());
        assert_eq!(
            QueryBuilder::count_memberships(&db, &project.id, &bob).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_list_members_joins_users() {
        let db = setup_test_db().await;
        let alice = insert_user(&db, "alice@example.com").await;
        let bob = insert_user(&db, "bob@example.com").await;
        let project = create_project(&db, "CORE", &alice).await;
        QueryBuilder::insert_membership(&db, &project.id, &bob, ProjectRole::Member)
            .await
            .unwrap();

        let members = QueryBuilder::list_members(&db, &project.id).await.unwrap();
        assert_eq!(members.len(), 2);
        let bob_row = members.iter().find(|m| m.member.user_id == bob).unwrap();
        assert_eq!(bob_row.user.email, "bob@example.com");
        assert_eq!(bob_row.member.role, ProjectRole::Member);
    }

    #[tokio::test]
    async fn test_issue_lifecycle_and_filters() {
        let db = setup_test_db().await;
        let alice = insert_user(&db, "alice@example.com").await;
        let project = create_project(&db, "CORE", &alice).await;

        let create = IssueCreate {
            project_id: project.id.clone(),
            title: "Crash".to_string(),
            description: Some("on start".to_string()),
            status: IssueStatus::Open,
            priority: IssuePriority::High,
            assignee_id: Some(alice.clone()),
        };
        let issue = QueryBuilder::create_issue(&db, &create, &alice).await.unwrap();
        assert_eq!(issue.reporter_id, alice);
        assert!(issue.updated_at.is_none());

        let low = IssueCreate {
            title: "Typo".to_string(),
            priority: IssuePriority::Low,
            assignee_id: None,
            ..create.clone()
        };
        QueryBuilder::create_issue(&db, &low, &alice).await.unwrap();

        let all = vec![project.id.to_string()];
        let (items, total) =
            QueryBuilder::list_issues(&db, all.clone(), &IssueFilter::default(), Page::default())
                .await
                .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(total, 2);

        let high = IssueFilter {
            priority: Some(IssuePriority::High),
            ..Default::default()
        };
        let (items, total) = QueryBuilder::list_issues(&db, all.clone(), &high, Page::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].title, "Crash");

        let (items, total) = QueryBuilder::list_issues(&db, all, &IssueFilter::default(), Page::new(0, 1))
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(total, 2);

        let update = IssueUpdate {
            status: Some(IssueStatus::Resolved),
            assignee_id: Some(None),
            ..Default::default()
        };
        let updated = QueryBuilder::update_issue(&db, &issue.id, &update).await.unwrap();
        assert_eq!(updated.status, IssueStatus::Resolved);
        assert_eq!(updated.title, "Crash");
        assert_eq!(updated.description.as_deref(), Some("on start"));
        assert!(updated.assignee_id.is_none());
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_comments_are_scoped_to_issue() {
        let db = setup_test_db().await;
        let alice = insert_user(&db, "alice@example.com").await;
        let project = create_project(&db, "CORE", &alice).await;
        let create = IssueCreate {
            project_id: project.id.clone(),
            title: "Crash".to_string(),
            description: None,
            status: IssueStatus::Open,
            priority: IssuePriority::Medium,
            assignee_id: None,
        };
        let first = QueryBuilder::create_issue(&db, &create, &alice).await.unwrap();
        let second = QueryBuilder::create_issue(&db, &create, &alice).await.unwrap();

        let body = CommentCreate {
            body: "Reproduced".to_string(),
        };
        let comment = QueryBuilder::create_comment(&db, &first.id, &alice, &body)
            .await
            .unwrap();
        assert_eq!(comment.author_id, alice);

        let comments = QueryBuilder::list_comments(&db, &first.id, Page::default())
            .await
            .unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].body, "Reproduced");

        let none = QueryBuilder::list_comments(&db, &second.id, Page::default())
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
