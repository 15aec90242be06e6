use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;

pub type Db = Surreal<Any>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: env::var("SURREALDB_URL")
                .unwrap_or_else(|_| "memory".to_string()),
            namespace: env::var("SURREALDB_NAMESPACE")
                .unwrap_or_else(|_| "issuehub".to_string()),
            database: env::var("SURREALDB_DATABASE")
                .unwrap_or_else(|_| "tracker".to_string()),
            username: env::var("SURREALDB_USERNAME").ok(),
            password: env::var("SURREALDB_PASSWORD").ok(),
        }
    }
}

impl DatabaseConfig {
    /// In-memory database, used by the test suites.
    pub fn memory() -> Self {
        Self {
            url: "memory".to_string(),
            namespace: "issuehub".to_string(),
            database: "tracker".to_string(),
            username: None,
            password: None,
        }
    }
}

pub async fn create_connection(config: DatabaseConfig) -> Result<Db> {
    let db = surrealdb::engine::any::connect(config.url).await?;

    // Sign in if credentials are provided
    if let (Some(username), Some(password)) = (config.username, config.password) {
        db.signin(Root {
            username: &username,
            password: &password,
        })
        .await?;
    }

    db.use_ns(config.namespace).use_db(config.database).await?;

    Ok(db)
}

/// Define tables and the unique indexes that back every uniqueness rule.
///
/// The indexes are the source of truth for email, project key and
/// (project, user) membership uniqueness; service-level pre-checks only
/// produce friendlier errors earlier.
pub async fn ensure_schema(db: &Db) -> Result<()> {
    let schema_queries = vec![
        // Accounts
        "DEFINE TABLE IF NOT EXISTS user SCHEMALESS;
         DEFINE FIELD IF NOT EXISTS email ON TABLE user TYPE string;
         DEFINE FIELD IF NOT EXISTS password_hash ON TABLE user TYPE string;
         DEFINE FIELD IF NOT EXISTS role ON TABLE user TYPE string
            ASSERT $value IN ['user', 'maintainer'];
         DEFINE FIELD IF NOT EXISTS created_at ON TABLE user TYPE string;",

        // Projects
        "DEFINE TABLE IF NOT EXISTS project SCHEMALESS;
         DEFINE FIELD IF NOT EXISTS name ON TABLE project TYPE string;
         DEFINE FIELD IF NOT EXISTS short_key ON TABLE project TYPE string;
         DEFINE FIELD IF NOT EXISTS created_at ON TABLE project TYPE string;",

        // Project membership
        "DEFINE TABLE IF NOT EXISTS project_member SCHEMALESS;
         DEFINE FIELD IF NOT EXISTS project_id ON TABLE project_member TYPE string;
         DEFINE FIELD IF NOT EXISTS user_id ON TABLE project_member TYPE string;
         DEFINE FIELD IF NOT EXISTS role ON TABLE project_member TYPE string
            ASSERT $value IN ['maintainer', 'member'];",

        // Issues
        "DEFINE TABLE IF NOT EXISTS issue SCHEMALESS;
         DEFINE FIELD IF NOT EXISTS project_id ON TABLE issue TYPE string;
         DEFINE FIELD IF NOT EXISTS title ON TABLE issue TYPE string;
         DEFINE FIELD IF NOT EXISTS status ON TABLE issue TYPE string
            ASSERT $value IN ['open', 'in_progress', 'resolved', 'closed'];
         DEFINE FIELD IF NOT EXISTS priority ON TABLE issue TYPE string
            ASSERT $value IN ['low', 'medium', 'high', 'critical'];
         DEFINE FIELD IF NOT EXISTS reporter_id ON TABLE issue TYPE string;
         DEFINE FIELD IF NOT EXISTS created_at ON TABLE issue TYPE string;",

        // Comments
        "DEFINE TABLE IF NOT EXISTS issue_comment SCHEMALESS;
         DEFINE FIELD IF NOT EXISTS issue_id ON TABLE issue_comment TYPE string;
         DEFINE FIELD IF NOT EXISTS author_id ON TABLE issue_comment TYPE string;
         DEFINE FIELD IF NOT EXISTS body ON TABLE issue_comment TYPE string;
         DEFINE FIELD IF NOT EXISTS created_at ON TABLE issue_comment TYPE string;",

        // Uniqueness and lookup indexes
        "DEFINE INDEX IF NOT EXISTS user_email ON TABLE user COLUMNS email UNIQUE;
         DEFINE INDEX IF NOT EXISTS project_short_key ON TABLE project COLUMNS short_key UNIQUE;
         DEFINE INDEX IF NOT EXISTS project_member_unique ON TABLE project_member COLUMNS project_id, user_id UNIQUE;
         DEFINE INDEX IF NOT EXISTS project_member_user ON TABLE project_member COLUMNS user_id;
         DEFINE INDEX IF NOT EXISTS issue_project ON TABLE issue COLUMNS project_id;
         DEFINE INDEX IF NOT EXISTS issue_comment_issue ON TABLE issue_comment COLUMNS issue_id;",
    ];

    for query in schema_queries {
        db.query(query).await?.check()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let db = create_connection(DatabaseConfig::memory()).await.unwrap();
        ensure_schema(&db).await.unwrap();
        ensure_schema(&db).await.unwrap();
    }

    #[test]
    fn test_memory_config() {
        let config = DatabaseConfig::memory();
        assert_eq!(config.url, "memory");
        assert!(config.username.is_none());
    }
}
