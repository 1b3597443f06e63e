//! User management service for admin operations.
//!
//! Passwords are hashed here and never leave this layer; a user's group only
//! changes through [`UserService::assign_group`].

use std::sync::Arc;

use tracing::{debug, info, instrument};
use validator::Validate;

use crate::auth::hashing;
use crate::auth::user::{
    AssignGroupRequest, CreateUserRequest, NewUser, UpdateUser, UpdateUserRequest, User,
};
use crate::domain::{Page, PageDefaults, PageRequest, SortOrder, UserId};
use crate::errors::{Error, Result};
use crate::observability::metrics;
use crate::storage::repositories::{
    AuditEvent, AuditLogRepository, GroupRepository, SqlxGroupRepository, SqlxTokenRepository,
    SqlxUserRepository, TokenRepository, UserRepository,
};
use crate::storage::DbPool;

/// Users list in id order, ten to a page.
pub const USER_PAGE_DEFAULTS: PageDefaults = PageDefaults {
    size: 10,
    sort: "id",
    order: SortOrder::Asc,
    sortable: &[
        ("id", "u.id"),
        ("username", "u.username"),
        ("email", "u.email"),
        ("lastName", "u.last_name"),
        ("createdAt", "u.created_at"),
    ],
};

/// Service for managing user accounts (admin-only operations).
#[derive(Clone)]
pub struct UserService {
    user_repository: Arc<dyn UserRepository>,
    group_repository: Arc<dyn GroupRepository>,
    token_repository: Arc<dyn TokenRepository>,
    audit_repository: Arc<AuditLogRepository>,
}

impl UserService {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        group_repository: Arc<dyn GroupRepository>,
        token_repository: Arc<dyn TokenRepository>,
        audit_repository: Arc<AuditLogRepository>,
    ) -> Self {
        Self { user_repository, group_repository, token_repository, audit_repository }
    }

    pub fn with_sqlx(pool: DbPool) -> Self {
        Self::new(
            Arc::new(SqlxUserRepository::new(pool.clone())),
            Arc::new(SqlxGroupRepository::new(pool.clone())),
            Arc::new(SqlxTokenRepository::new(pool.clone())),
            Arc::new(AuditLogRepository::new(pool)),
        )
    }

    /// Create a new user account in the named group.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User> {
        request.validate()?;

        let group = self
            .group_repository
            .get_group_by_name(&request.group_name)
            .await?
            .ok_or_else(|| Error::not_found("Group", request.group_name.clone()))?;

        let password_hash = hashing::hash_password(&request.password)?;

        let user = self
            .user_repository
            .create_user(NewUser {
                id: UserId::new(),
                first_name: request.first_name,
                last_name: request.last_name,
                username: request.username,
                email: User::normalize_email(&request.email),
                password_hash,
                enabled: request.enabled,
                expired: false,
                group_id: group.id,
            })
            .await?;

        self.audit("user.created", &user).await?;
        info!(user_id = %user.id, group = %user.group.name, "user created");
        Ok(user)
    }

    pub async fn get_user(&self, id: &UserId) -> Result<User> {
        self.user_repository
            .get_user(id)
            .await?
            .ok_or_else(|| Error::not_found("User", id.as_str()))
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<User> {
        self.user_repository
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| Error::not_found("User", username))
    }

    pub async fn list_users(&self, request: &PageRequest) -> Result<Page<User>> {
        let resolved = request.resolve(&USER_PAGE_DEFAULTS)?;
        let users = self.user_repository.list_users(&resolved).await?;
        let total = self.user_repository.count_users().await?;
        Ok(Page::new(users, &resolved, total))
    }

    /// Update names and username. Email, password and group are untouched.
    #[instrument(skip(self, request), fields(user_id = %id))]
    pub async fn update_user(&self, id: &UserId, request: UpdateUserRequest) -> Result<User> {
        request.validate()?;

        let current = self.get_user(id).await?;
        let renamed = request.username.as_ref().is_some_and(|name| *name != current.username);

        let user = self
            .user_repository
            .update_user(
                id,
                UpdateUser {
                    first_name: request.first_name,
                    last_name: request.last_name,
                    username: request.username,
                },
            )
            .await?;

        // Tokens carry the username as subject; a successor taking the old
        // name must not inherit them.
        if renamed {
            let revoked = self.token_repository.revoke_active_for_user(&user.id, None).await?;
            metrics::record_tokens_revoked(revoked).await;
            debug!(user_id = %user.id, revoked, "tokens revoked after username change");
        }

        self.audit("user.updated", &user).await?;
        Ok(user)
    }

    #[instrument(skip(self, request), fields(user_id = %id, group = %request.group_name))]
    pub async fn assign_group(&self, id: &UserId, request: AssignGroupRequest) -> Result<User> {
        request.validate()?;

        let group = self
            .group_repository
            .get_group_by_name(&request.group_name)
            .await?
            .ok_or_else(|| Error::not_found("Group", request.group_name.clone()))?;

        let user = self.user_repository.assign_group(id, &group.id).await?;
        self.audit("user.group_assigned", &user).await?;
        info!(user_id = %user.id, group = %group.name, "group assigned");
        Ok(user)
    }

    /// Delete a user. Their token records go with them.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn delete_user(&self, id: &UserId) -> Result<()> {
        let user = self.get_user(id).await?;
        self.user_repository.delete_user(id).await?;
        self.audit("user.deleted", &user).await?;
        Ok(())
    }

    async fn audit(&self, action: &str, user: &User) -> Result<()> {
        self.audit_repository
            .record_admin_event(
                AuditEvent::auth(
                    action,
                    Some(user.id.as_str()),
                    Some(&user.username),
                    serde_json::json!({ "group": user.group.name, "enabled": user.enabled }),
                )
                .with_user(user.id.to_string()),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::group_service::GroupService;
    use crate::auth::models::{NewToken, TokenStatus};
    use crate::auth::validation::CreateGroupRequest;
    use crate::storage::test_helpers::memory_pool;

    async fn setup() -> (DbPool, UserService) {
        let pool = memory_pool().await;
        let groups = GroupService::with_sqlx(pool.clone());
        for (name, permissions) in [("Ops", vec!["admin:read"]), ("Sales", vec!["representative:read"])] {
            groups
                .create_group(CreateGroupRequest {
                    name: name.into(),
                    description: String::new(),
                    permissions: permissions.into_iter().map(String::from).collect(),
                })
                .await
                .unwrap();
        }
        (pool.clone(), UserService::with_sqlx(pool))
    }

    fn request(username: &str, group: &str) -> CreateUserRequest {
        CreateUserRequest {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            username: username.into(),
            email: format!("{}@Example.com", username),
            password: "Analytical1".into(),
            group_name: group.into(),
            enabled: true,
        }
    }

    #[tokio::test]
    async fn create_hashes_password_and_normalizes_email() {
        let (pool, service) = setup().await;

        let user = service.create_user(request("ada", "Ops")).await.unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.group.name, "Ops");

        let (_, hash) = SqlxUserRepository::new(pool.clone())
            .get_user_with_password("ada")
            .await
            .unwrap()
            .unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hashing::verify_password("Analytical1", &hash).unwrap());

        let audit = AuditLogRepository::new(pool);
        let entries = audit.list_by_action("user.created", 5).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].resource_type, "admin.identity");
    }

    #[tokio::test]
    async fn create_requires_existing_group_and_valid_fields() {
        let (_, service) = setup().await;

        assert!(matches!(
            service.create_user(request("ada", "Nope")).await,
            Err(Error::NotFound { .. })
        ));

        let mut weak = request("bob", "Ops");
        weak.password = "short".into();
        assert!(matches!(service.create_user(weak).await, Err(Error::Validation { .. })));
    }

    #[tokio::test]
    async fn update_changes_profile_only() {
        let (_, service) = setup().await;
        let user = service.create_user(request("ada", "Ops")).await.unwrap();

        let updated = service
            .update_user(
                &user.id,
                UpdateUserRequest { first_name: Some("Augusta".into()), ..Default::default() },
            )
            .await
            .unwrap();

        assert_eq!(updated.first_name, "Augusta");
        assert_eq!(updated.username, "ada");
        assert_eq!(updated.group.name, "Ops");
    }

    #[tokio::test]
    async fn username_change_revokes_active_tokens() {
        let (pool, service) = setup().await;
        let user = service.create_user(request("ada", "Ops")).await.unwrap();
        let tokens = SqlxTokenRepository::new(pool);
        let issued = tokens.save_token(NewToken::bearer("ada-token".into(), user.id.clone())).await.unwrap();

        service
            .update_user(&user.id, UpdateUserRequest { username: Some("ada".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(tokens.find_by_token("ada-token").await.unwrap().unwrap().status, TokenStatus::Active);

        let renamed = service
            .update_user(&user.id, UpdateUserRequest { username: Some("augusta".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(renamed.username, "augusta");

        let record = tokens.find_by_token("ada-token").await.unwrap().unwrap();
        assert_eq!(record.id, issued.id);
        assert_eq!(record.status, TokenStatus::Revoked);
    }

    #[tokio::test]
    async fn assign_group_moves_user() {
        let (_, service) = setup().await;
        let user = service.create_user(request("ada", "Ops")).await.unwrap();

        let moved = service
            .assign_group(&user.id, AssignGroupRequest { group_name: "Sales".into() })
            .await
            .unwrap();

        assert_eq!(moved.group.name, "Sales");
        assert!(moved.authorities().contains("representative:read"));
        assert!(!moved.authorities().contains("admin:read"));
    }

    #[tokio::test]
    async fn list_and_delete() {
        let (_, service) = setup().await;
        for name in ["ada", "bob", "cyd"] {
            service.create_user(request(name, "Ops")).await.unwrap();
        }

        let page = service.list_users(&PageRequest::new(0, 2)).await.unwrap();
        assert_eq!(page.total_elements, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.content.len(), 2);

        let bob = service.get_user_by_username("bob").await.unwrap();
        service.delete_user(&bob.id).await.unwrap();
        assert!(matches!(service.get_user(&bob.id).await, Err(Error::NotFound { .. })));
        assert_eq!(service.list_users(&PageRequest::default()).await.unwrap().total_elements, 2);
    }
}
