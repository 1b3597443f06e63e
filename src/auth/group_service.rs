//! Group management service.
//!
//! Permission identifiers arrive as raw strings and are parsed against the
//! catalog before anything is written; one unknown identifier fails the whole
//! write.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{info, instrument, warn};
use validator::Validate;

use crate::auth::validation::{CreateGroupRequest, UpdateGroupRequest};
use crate::domain::{Group, GroupId, Page, PageDefaults, PageRequest, Permission, SortOrder};
use crate::errors::{Error, Result};
use crate::storage::repositories::{
    AuditEvent, AuditLogRepository, GroupRepository, NewGroup, SqlxGroupRepository, UpdateGroup,
};
use crate::storage::DbPool;

/// Groups list newest first, fifteen to a page.
pub const GROUP_PAGE_DEFAULTS: PageDefaults = PageDefaults {
    size: 15,
    sort: "createdAt",
    order: SortOrder::Desc,
    sortable: &[("createdAt", "created_at"), ("name", "name"), ("id", "id")],
};

#[derive(Clone)]
pub struct GroupService {
    group_repository: Arc<dyn GroupRepository>,
    audit_repository: Arc<AuditLogRepository>,
}

impl GroupService {
    pub fn new(
        group_repository: Arc<dyn GroupRepository>,
        audit_repository: Arc<AuditLogRepository>,
    ) -> Self {
        Self { group_repository, audit_repository }
    }

    pub fn with_sqlx(pool: DbPool) -> Self {
        Self::new(
            Arc::new(SqlxGroupRepository::new(pool.clone())),
            Arc::new(AuditLogRepository::new(pool)),
        )
    }

    pub async fn get_group(&self, id: &GroupId) -> Result<Group> {
        self.group_repository
            .get_group(id)
            .await?
            .ok_or_else(|| Error::not_found("Group", id.as_str()))
    }

    pub async fn get_group_by_name(&self, name: &str) -> Result<Group> {
        self.group_repository
            .get_group_by_name(name)
            .await?
            .ok_or_else(|| Error::not_found("Group", name))
    }

    pub async fn list_groups(&self, request: &PageRequest) -> Result<Page<Group>> {
        let resolved = request.resolve(&GROUP_PAGE_DEFAULTS)?;
        let groups = self.group_repository.list_groups(&resolved).await?;
        let total = self.group_repository.count_groups().await?;
        Ok(Page::new(groups, &resolved, total))
    }

    #[instrument(skip(self, request), fields(group_name = %request.name))]
    pub async fn create_group(&self, request: CreateGroupRequest) -> Result<Group> {
        request.validate()?;
        let permissions = parse_permissions(&request.permissions)?;

        let group = self
            .group_repository
            .create_group(NewGroup {
                id: GroupId::new(),
                name: request.name,
                description: request.description,
                permissions,
            })
            .await?;

        self.audit("group.created", &group).await?;
        info!(group_id = %group.id, "group created");
        Ok(group)
    }

    #[instrument(skip(self, request), fields(group_id = %id))]
    pub async fn update_group(&self, id: &GroupId, request: UpdateGroupRequest) -> Result<Group> {
        request.validate()?;
        let permissions = request.permissions.as_deref().map(parse_permissions).transpose()?;

        let group = self
            .group_repository
            .update_group(
                id,
                UpdateGroup { name: request.name, description: request.description, permissions },
            )
            .await?;

        self.audit("group.updated", &group).await?;
        Ok(group)
    }

    #[instrument(skip(self), fields(group_id = %id))]
    pub async fn delete_group(&self, id: &GroupId) -> Result<()> {
        let group = self.get_group(id).await?;
        self.group_repository.delete_group(id).await?;
        self.audit("group.deleted", &group).await?;
        info!(group_id = %id, "group deleted");
        Ok(())
    }

    async fn audit(&self, action: &str, group: &Group) -> Result<()> {
        self.audit_repository
            .record_admin_event(AuditEvent::auth(
                action,
                Some(group.id.as_str()),
                Some(&group.name),
                serde_json::json!({
                    "permissions": group.permissions.iter().map(Permission::as_str).collect::<Vec<_>>(),
                }),
            ))
            .await
    }
}

/// Parse every identifier or fail on the first unknown one.
pub fn parse_permissions(raw: &[String]) -> Result<BTreeSet<Permission>> {
    match Permission::parse_all(raw) {
        Ok(permissions) => Ok(permissions.into_iter().collect()),
        Err(err) => {
            warn!(identifier = %err.0, "rejected unknown permission");
            Err(err.into())
        }
    }
}
