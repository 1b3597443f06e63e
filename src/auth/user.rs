//! User domain models and data structures.
//!
//! Defines the user account entity along with the request/response DTOs used by
//! the authentication and user management endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;

use super::validation::{validate_password, validate_person_name, validate_username};
use crate::domain::{Group, UserId};

/// Stored representation of a user account together with its group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub enabled: bool,
    pub expired: bool,
    pub group: Group,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A user may authenticate only while enabled and not expired.
    pub fn can_authenticate(&self) -> bool {
        self.enabled && !self.expired
    }

    /// Authorities derived from the user's group.
    pub fn authorities(&self) -> BTreeSet<String> {
        self.group.authorities()
    }

    /// Normalize email to lowercase for consistent storage and comparison.
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }
}

/// New user database payload. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub enabled: bool,
    pub expired: bool,
    pub group_id: crate::domain::GroupId,
}

/// Profile fields a user update may change.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

/// Login credentials. `username` may also carry an email address.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationRequest {
    #[validate(length(min = 1, max = 255))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Access/refresh token pair returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Request to create a new user account.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(custom(function = "validate_person_name"))]
    pub first_name: String,
    #[validate(custom(function = "validate_person_name"))]
    pub last_name: String,
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub group_name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Request to update a user's profile. Only names and username may change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(custom(function = "validate_person_name"))]
    pub first_name: Option<String>,
    #[validate(custom(function = "validate_person_name"))]
    pub last_name: Option<String>,
    #[validate(custom(function = "validate_username"))]
    pub username: Option<String>,
}

/// Request to move a user to another group.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignGroupRequest {
    #[validate(length(min = 1, max = 100))]
    pub group_name: String,
}

/// User as exposed by the API. Never carries the password.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub enabled: bool,
    pub expired: bool,
    pub group_name: String,
    pub group_authorities: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let group_authorities = user.authorities();
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            email: user.email,
            enabled: user.enabled,
            expired: user.expired,
            group_name: user.group.name,
            group_authorities,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GroupId, Permission};

    fn sample_user() -> User {
        User {
            id: UserId::new(),
            first_name: "Alice".into(),
            last_name: "Doe".into(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            enabled: true,
            expired: false,
            group: Group {
                id: GroupId::new(),
                name: "Managers".into(),
                description: String::new(),
                permissions: [Permission::ManagerRead].into_iter().collect(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn disabled_or_expired_users_cannot_authenticate() {
        let mut user = sample_user();
        assert!(user.can_authenticate());

        user.enabled = false;
        assert!(!user.can_authenticate());

        user.enabled = true;
        user.expired = true;
        assert!(!user.can_authenticate());
    }

    #[test]
    fn response_carries_group_authorities() {
        let response = UserResponse::from(sample_user());
        assert_eq!(response.group_name, "Managers");
        assert!(response.group_authorities.contains("management:read"));
        assert!(response.group_authorities.contains("ROLE_Managers"));

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["firstName"], "Alice");
    }

    #[test]
    fn normalize_email_lowercases_and_trims() {
        assert_eq!(User::normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn create_request_defaults_to_enabled() {
        let request: CreateUserRequest = serde_json::from_value(serde_json::json!({
            "firstName": "Bob",
            "lastName": "Smith",
            "username": "bob",
            "email": "bob@example.com",
            "password": "Sup3r$ecret",
            "groupName": "Managers"
        }))
        .unwrap();
        assert!(request.enabled);
        assert!(request.validate().is_ok());
    }
}
