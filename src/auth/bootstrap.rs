//! Startup seeding of the super administrator.

use tracing::info;

use crate::auth::group_service::GroupService;
use crate::auth::user::{CreateUserRequest, User};
use crate::auth::user_service::UserService;
use crate::auth::validation::CreateGroupRequest;
use crate::config::AuthConfig;
use crate::domain::Permission;
use crate::errors::{Error, Result};

pub const SUPER_ADMIN_GROUP_NAME: &str = "Super Admin";
pub const SUPER_ADMIN_USERNAME: &str = "admin";

/// Create the "Super Admin" group with every permission and the `admin` user
/// when they do not exist yet. Does nothing without a bootstrap password.
///
/// Returns the admin user when one exists after the call.
pub async fn ensure_super_admin(
    groups: &GroupService,
    users: &UserService,
    config: &AuthConfig,
) -> Result<Option<User>> {
    let Some(password) = config.bootstrap_admin_password.as_deref() else {
        info!("no bootstrap admin password configured, skipping super admin seeding");
        return Ok(None);
    };

    match groups.get_group_by_name(SUPER_ADMIN_GROUP_NAME).await {
        Ok(_) => {}
        Err(Error::NotFound { .. }) => {
            groups
                .create_group(CreateGroupRequest {
                    name: SUPER_ADMIN_GROUP_NAME.to_string(),
                    description: "Super Admin Group".to_string(),
                    permissions: Permission::all().iter().map(|p| p.name().to_string()).collect(),
                })
                .await?;
            info!(group = SUPER_ADMIN_GROUP_NAME, "created super admin group");
        }
        Err(err) => return Err(err),
    }

    match users.get_user_by_username(SUPER_ADMIN_USERNAME).await {
        Ok(user) => Ok(Some(user)),
        Err(Error::NotFound { .. }) => {
            let user = users
                .create_user(CreateUserRequest {
                    first_name: "Admin".to_string(),
                    last_name: "Super".to_string(),
                    username: SUPER_ADMIN_USERNAME.to_string(),
                    email: config.bootstrap_admin_email.clone(),
                    password: password.to_string(),
                    group_name: SUPER_ADMIN_GROUP_NAME.to_string(),
                    enabled: true,
                })
                .await?;
            info!(user_id = %user.id, "created super admin user");
            Ok(Some(user))
        }
        Err(err) => Err(err),
    }
}
