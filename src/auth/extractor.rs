//! Authentication guard, login and signup.

use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::auth::context::Principal;
use crate::auth::password::PasswordHasher;
use crate::auth::token::{Clock, TokenService, DEFAULT_TTL_MINUTES};
use crate::auth::user_store::{NewUser, UserStore};
use crate::db::{Db, WriteOutcome};
use crate::error::{TrackerError, TrackerResult};
use crate::model::{GlobalRole, Token, User, UserCreate};
use crate::policy::ConflictReason;

/// Signing secret used when none is configured. Only fit for development.
pub const DEV_SECRET_KEY: &str = "issuehub-development-secret-change-me";

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub secret_key: String,
    /// Access token lifetime in minutes
    pub token_ttl_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: DEV_SECRET_KEY.to_string(),
            token_ttl_minutes: DEFAULT_TTL_MINUTES,
        }
    }
}

impl AuthConfig {
    pub fn new(secret_key: String, token_ttl_minutes: i64) -> Self {
        Self {
            secret_key,
            token_ttl_minutes,
        }
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.secret_key == DEV_SECRET_KEY
    }
}

/// Authentication errors.
///
/// Messages are deliberately coarse: an expired token, a forged one and one
/// for a deleted user all read the same, as do an unknown email and a wrong
/// password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization: Bearer <token>` header
    MissingOrMalformed,
    /// Token failed verification or names no user
    InvalidCredentials,
    /// Unknown email or wrong password
    BadLogin,
    /// Storage failure while authenticating
    Database(String),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingOrMalformed => "missing_or_malformed",
            Self::InvalidCredentials => "invalid_credentials",
            Self::BadLogin => "bad_login",
            Self::Database(_) => "internal_error",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingOrMalformed => write!(f, "Not authenticated"),
            Self::InvalidCredentials => write!(f, "Could not validate credentials"),
            Self::BadLogin => write!(f, "Incorrect email or password"),
            Self::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

/// Resolves bearer tokens to principals and runs the login and signup flows.
pub struct Authenticator {
    config: AuthConfig,
    user_store: Arc<UserStore>,
    tokens: TokenService,
    hasher: PasswordHasher,
    /// Verified against when the email is unknown so both login failures
    /// cost the same.
    dummy_hash: Option<String>,
}

impl Authenticator {
    pub fn new(config: AuthConfig, db: Db) -> Self {
        let tokens = TokenService::new(
            &config.secret_key,
            Duration::minutes(config.token_ttl_minutes),
        );
        let hasher = PasswordHasher::new();
        let dummy_hash = match hasher.hash(DEV_SECRET_KEY) {
            Ok(hash) => Some(hash),
            Err(e) => {
                error!(
                    "Failed to prepare dummy password hash; unknown-email logins will return faster: {}",
                    e
                );
                None
            }
        };

        Self {
            config,
            user_store: Arc::new(UserStore::new(db)),
            tokens,
            hasher,
            dummy_hash,
        }
    }

    /// Replace the clock used for token issue and expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.tokens = self.tokens.with_clock(clock);
        self
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn user_store(&self) -> &Arc<UserStore> {
        &self.user_store
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Resolve an `Authorization` header value to a principal.
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<Principal, AuthError> {
        let token = authorization
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingOrMalformed)?;

        let user_id = self.tokens.verify(token).map_err(|e| {
            warn!("Rejected bearer token: {}", e);
            AuthError::InvalidCredentials
        })?;

        let user = self
            .user_store
            .get_user_by_id(&user_id)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?
            .ok_or_else(|| {
                warn!("Token subject {} does not resolve to a user", user_id);
                AuthError::InvalidCredentials
            })?;

        debug!("Authenticated {}", user.email);
        Ok(Principal::from(&user))
    }

    /// Exchange an email and password for an access token.
    pub async fn login(&self, email: &str, password: &str) -> Result<Token, AuthError> {
        let credentials = self
            .user_store
            .get_credentials_by_email(email)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;

        let Some(credentials) = credentials else {
            if let Some(dummy) = &self.dummy_hash {
                let _ = self.hasher.verify_blocking(password, dummy).await;
            }
            warn!("Login failed");
            return Err(AuthError::BadLogin);
        };

        let matches = self
            .hasher
            .verify_blocking(password, &credentials.password_hash)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;
        if !matches {
            warn!("Login failed");
            return Err(AuthError::BadLogin);
        }

        let token = self
            .tokens
            .issue(&credentials.user.id)
            .map_err(|e| AuthError::Database(e.to_string()))?;

        info!("User {} logged in", credentials.user.id);
        Ok(Token::bearer(token))
    }

    /// Register a new account with the default global role.
    pub async fn signup(&self, data: &UserCreate) -> TrackerResult<User> {
        data.validate()?;

        if self.user_store.email_exists(&data.email).await? {
            return Err(TrackerError::Conflict(ConflictReason::DuplicateEmail));
        }

        let new_user = NewUser {
            email: data.email.clone(),
            name: data.name.clone(),
            password_hash: self.hasher.hash_blocking(&data.password).await?,
            role: GlobalRole::default(),
        };

        match self.user_store.create_user(&new_user).await? {
            WriteOutcome::Written(user) => {
                info!("Registered user {}", user.id);
                Ok(user)
            }
            WriteOutcome::Duplicate => Err(TrackerError::Conflict(ConflictReason::DuplicateEmail)),
        }
    }
}
