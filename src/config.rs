use serde::Deserialize;
use std::env;

use crate::auth::{AuthConfig, DEV_SECRET_KEY};
use crate::auth::token::DEFAULT_TTL_MINUTES;

/// Application settings, read from the environment with development defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub project_name: String,
    /// Prefix every API route is mounted under, e.g. `/api/v1`.
    pub api_prefix: String,
    pub secret_key: String,
    pub access_token_expire_minutes: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            project_name: env::var("PROJECT_NAME").unwrap_or_else(|_| "IssueHub".to_string()),
            api_prefix: env::var("API_V1_STR").unwrap_or_else(|_| "/api/v1".to_string()),
            secret_key: env::var("SECRET_KEY").unwrap_or_else(|_| DEV_SECRET_KEY.to_string()),
            access_token_expire_minutes: env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TTL_MINUTES),
        }
    }
}

impl AppConfig {
    /// Fixed settings that ignore the environment.
    pub fn for_tests() -> Self {
        Self {
            project_name: "IssueHub".to_string(),
            api_prefix: "/api/v1".to_string(),
            secret_key: "test-secret".to_string(),
            access_token_expire_minutes: DEFAULT_TTL_MINUTES,
        }
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(self.secret_key.clone(), self.access_token_expire_minutes)
    }

    /// Normalized prefix: leading slash, no trailing slash, empty for root.
    pub fn normalized_prefix(&self) -> String {
        let trimmed = self.api_prefix.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_normalization() {
        let mut config = AppConfig::for_tests();
        assert_eq!(config.normalized_prefix(), "/api/v1");

        config.api_prefix = "api/v2/".to_string();
        assert_eq!(config.normalized_prefix(), "/api/v2");

        config.api_prefix = "/".to_string();
        assert_eq!(config.normalized_prefix(), "");
    }

    #[test]
    fn test_auth_config_carries_secret_and_ttl() {
        let mut config = AppConfig::for_tests();
        config.access_token_expire_minutes = 5;

        let auth = config.auth_config();
        assert_eq!(auth.secret_key, "test-secret");
        assert_eq!(auth.token_ttl_minutes, 5);
        assert!(!auth.uses_dev_secret());
    }
}
