//! Authority requirements for protected routes.

use std::sync::Arc;

use crate::auth::middleware::RequiredAuthorities;
use crate::auth::models::{AuthContext, AuthError};
use crate::domain::Permission;

/// Build the state for [`crate::auth::middleware::require_authorities`].
pub fn requires(permissions: &[Permission]) -> RequiredAuthorities {
    Arc::new(permissions.iter().map(|permission| permission.as_str().to_string()).collect())
}

/// Check a single permission against an established identity.
pub fn require_permission(context: &AuthContext, permission: Permission) -> Result<(), AuthError> {
    if context.has_authority(permission.as_str()) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    #[test]
    fn requires_lists_identifiers() {
        let required = requires(&[Permission::AdminRead, Permission::AdminUpdate]);
        assert_eq!(required.as_slice(), ["admin:read", "admin:update"]);
    }

    #[test]
    fn require_permission_checks_authorities() {
        let context = AuthContext::new(
            UserId::new(),
            "alice".into(),
            ["admin:read".to_string(), "ROLE_Ops".to_string()].into_iter().collect(),
        );

        assert!(require_permission(&context, Permission::AdminRead).is_ok());
        assert!(matches!(
            require_permission(&context, Permission::AdminDelete),
            Err(AuthError::Forbidden)
        ));
    }
}
