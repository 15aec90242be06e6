//! User storage and management.

use anyhow::{anyhow, Result};

use crate::db::schema::{now_timestamp, UserRecord, USER_FIELDS};
use crate::db::{write_unique, Db, WriteOutcome, USER_EMAIL_INDEX};
use crate::model::{GlobalRole, Page, User};
use crate::types::UserId;

/// Fields for a new account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub role: GlobalRole,
}

/// Stored credentials for the login flow.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

/// User store for database operations.
#[derive(Clone)]
pub struct UserStore {
    db: Db,
}

impl UserStore {
    /// Create a new user store.
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Insert a user. Returns `Duplicate` when the email is already taken,
    /// including when a concurrent signup wins the race.
    pub async fn create_user(&self, new_user: &NewUser) -> Result<WriteOutcome<User>> {
        let user_id = UserId::generate();

        let query = r#"
            CREATE type::thing('user', $id) CONTENT {
                email: $email,
                name: $name,
                password_hash: $password_hash,
                role: $role,
                created_at: $created_at
            } RETURN NONE
        "#;

        let created_at = now_timestamp();
        let duplicate = write_unique(USER_EMAIL_INDEX, || {
            let pending = self
                .db
                .query(query)
                .bind(("id", user_id.to_string()))
                .bind(("email", new_user.email.clone()))
                .bind(("name", new_user.name.clone()))
                .bind(("password_hash", new_user.password_hash.clone()))
                .bind(("role", new_user.role.as_str()))
                .bind(("created_at", created_at.clone()));
            async move { pending.await.map_err(anyhow::Error::from) }
        })
        .await?;

        if duplicate {
            return Ok(WriteOutcome::Duplicate);
        }

        let user = self
            .get_user_by_id(&user_id)
            .await?
            .ok_or_else(|| anyhow!("user {} missing after create", user_id))?;
        Ok(WriteOutcome::Written(user))
    }

    /// Get a user by database ID.
    pub async fn get_user_by_id(&self, user_id: &UserId) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM type::thing('user', $id)", USER_FIELDS);

        let mut res = self
            .db
            .query(query)
            .bind(("id", user_id.to_string()))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        users.into_iter().next().map(UserRecord::into_user).transpose()
    }

    /// Look up a user and their password hash by exact email.
    pub async fn get_credentials_by_email(&self, email: &str) -> Result<Option<Credentials>> {
        let query = format!(
            "SELECT {} FROM user WHERE email = $email LIMIT 1",
            USER_FIELDS
        );

        let mut res = self
            .db
            .query(query)
            .bind(("email", email.to_string()))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        match users.into_iter().next() {
            Some(record) => {
                let password_hash = record.password_hash.clone();
                Ok(Some(Credentials {
                    user: record.into_user()?,
                    password_hash,
                }))
            }
            None => Ok(None),
        }
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.get_credentials_by_email(email).await?.is_some())
    }

    /// Registered users, oldest first.
    pub async fn list_users(&self, page: Page) -> Result<Vec<User>> {
        let query = format!(
            "SELECT {} FROM user ORDER BY created_at ASC LIMIT $limit START $skip",
            USER_FIELDS
        );

        let mut res = self
            .db
            .query(query)
            .bind(("limit", page.limit))
            .bind(("skip", page.skip))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        users.into_iter().map(UserRecord::into_user).collect()
    }
}
