//! Request-scoped identity.

use serde::{Deserialize, Serialize};

use crate::model::{GlobalRole, User};
use crate::types::UserId;

/// The authenticated caller of a request.
///
/// Built once by the authentication guard from the stored user record and
/// immutable afterwards. Project roles are deliberately absent: they are
/// looked up per request and never cached here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    user_id: UserId,
    email: String,
    name: Option<String>,
    role: GlobalRole,
}

impl Principal {
    pub fn new(user_id: UserId, email: String, name: Option<String>, role: GlobalRole) -> Self {
        Self {
            user_id,
            email,
            name,
            role,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Account-wide role. Informational only; project authorization never
    /// reads it.
    pub fn global_role(&self) -> GlobalRole {
        self.role
    }

    /// Name for log lines, falling back to the email address.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self::new(
            user.id.clone(),
            user.email.clone(),
            user.name.clone(),
            user.role,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_email() {
        let anon = Principal::new(
            UserId::new("u1"),
            "a@example.com".to_string(),
            None,
            GlobalRole::User,
        );
        assert_eq!(anon.display_name(), "a@example.com");

        let named = Principal::new(
            UserId::new("u2"),
            "b@example.com".to_string(),
            Some("Bea".to_string()),
            GlobalRole::Maintainer,
        );
        assert_eq!(named.display_name(), "Bea");
        assert_eq!(named.global_role(), GlobalRole::Maintainer);
    }
}
