//! Validation helpers and request DTOs for group endpoints, plus the field
//! validators shared with the user DTOs.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

lazy_static! {
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9._-]{3,64}$")
        .expect("USERNAME_REGEX should be a valid regex pattern");
    static ref GROUP_NAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 _-]{0,99}$")
        .expect("GROUP_NAME_REGEX should be a valid regex pattern");
}

/// Minimum password length requirement
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length to prevent DoS
const MAX_PASSWORD_LENGTH: usize = 128;

/// Request to create a group. Permissions are raw identifiers and are parsed
/// against the catalog by the group service.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    #[validate(custom(function = "validate_group_name"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Request to update a group. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupRequest {
    #[validate(custom(function = "validate_group_name"))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME_REGEX.is_match(username) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_username"))
    }
}

pub fn validate_group_name(name: &str) -> Result<(), ValidationError> {
    if GROUP_NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_group_name"))
    }
}

/// Validate first/last name (non-empty, reasonable length)
pub fn validate_person_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::new("name_empty"));
    }

    if trimmed.len() > 100 {
        return Err(ValidationError::new("name_too_long"));
    }

    Ok(())
}

/// Validate password strength: 8 to 128 characters with at least one
/// uppercase letter, one lowercase letter and one digit.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::new("password_too_short"));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::new("password_too_long"));
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(ValidationError::new("password_missing_uppercase"));
    }

    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(ValidationError::new("password_missing_lowercase"));
    }

    if !password.chars().any(|c| c.is_numeric()) {
        return Err(ValidationError::new("password_missing_digit"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("j.doe-2").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
    }

    #[test]
    fn group_names() {
        assert!(validate_group_name("Super Admin").is_ok());
        assert!(validate_group_name("ops_team-1").is_ok());
        assert!(validate_group_name(" leading").is_err());
        assert!(validate_group_name("").is_err());
    }

    #[test]
    fn passwords() {
        assert!(validate_password("Passw0rd").is_ok());
        assert_eq!(validate_password("Sh0rt").unwrap_err().code, "password_too_short");
        assert_eq!(validate_password("alllower1").unwrap_err().code, "password_missing_uppercase");
        assert_eq!(validate_password("NoDigitsHere").unwrap_err().code, "password_missing_digit");
    }

    #[test]
    fn update_group_request_allows_partial_payloads() {
        let request = UpdateGroupRequest { description: Some("new".into()), ..Default::default() };
        assert!(request.validate().is_ok());

        let request = UpdateGroupRequest { name: Some("".into()), ..Default::default() };
        assert!(request.validate().is_err());
    }

    #[test]
    fn create_group_request_defaults() {
        let request: CreateGroupRequest =
            serde_json::from_value(serde_json::json!({ "name": "Managers" })).unwrap();
        assert!(request.permissions.is_empty());
        assert!(request.validate().is_ok());
    }
}
