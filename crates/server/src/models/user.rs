//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shelfwise_core::{Email, Role, UserId};

/// A staff account (domain type). The password hash never leaves the repository.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login email, stored lowercased.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Role deciding which operations the user may perform.
    pub role: Role,
    /// Inactive users cannot log in and their sessions are rejected.
    pub is_active: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Self-registration payload.
#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Login payload.
#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Admin-created user payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

/// Admin user update payload; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

impl UpdateUserInput {
    /// Whether applying this update to `target` would lock the acting admin out.
    #[must_use]
    pub fn demotes_or_deactivates(&self, target: &User) -> bool {
        let demoted = self.role.is_some_and(|r| r != Role::Admin) && target.role == Role::Admin;
        let deactivated = self.is_active == Some(false) && target.is_active;
        demoted || deactivated
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn admin() -> User {
        User {
            id: UserId::new(1),
            email: Email::parse("owner@shop.test").unwrap(),
            name: "Owner".to_string(),
            role: Role::Admin,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_self_lockout_detection() {
        let target = admin();
        let demote = UpdateUserInput {
            role: Some(Role::Manager),
            ..UpdateUserInput::default()
        };
        assert!(demote.demotes_or_deactivates(&target));

        let deactivate = UpdateUserInput {
            is_active: Some(false),
            ..UpdateUserInput::default()
        };
        assert!(deactivate.demotes_or_deactivates(&target));

        let rename = UpdateUserInput {
            name: Some("Boss".to_string()),
            role: Some(Role::Admin),
            ..UpdateUserInput::default()
        };
        assert!(!rename.demotes_or_deactivates(&target));
    }

    #[test]
    fn test_create_user_defaults_active() {
        let input: CreateUserInput = serde_json::from_value(serde_json::json!({
            "email": "clerk@shop.test",
            "password": "correct horse",
            "name": "Clerk",
            "role": "staff"
        }))
        .unwrap();
        assert!(input.is_active);
        assert_eq!(input.role, Role::Staff);
    }
}
