//! Group repository.
//!
//! Permissions are persisted as a JSON array of catalog identifiers and parsed
//! back strictly, so a corrupt row surfaces as an error instead of silently
//! losing authorities.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::instrument;

use crate::domain::{Group, GroupId, Permission, ResolvedPage};
use crate::errors::{AuthgateError, Result};
use crate::storage::DbPool;

#[derive(Debug, Clone, FromRow)]
struct GroupRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub permissions: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<GroupRow> for Group {
    type Error = AuthgateError;

    fn try_from(row: GroupRow) -> Result<Self> {
        Ok(Group {
            id: GroupId::from_string(row.id),
            name: row.name,
            description: row.description,
            permissions: decode_permissions(&row.permissions)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(crate) fn decode_permissions(raw: &str) -> Result<BTreeSet<Permission>> {
    let identifiers: Vec<String> = serde_json::from_str(raw)?;
    Ok(Permission::parse_all(identifiers)?.into_iter().collect())
}

pub(crate) fn encode_permissions(permissions: &BTreeSet<Permission>) -> Result<String> {
    let identifiers: Vec<&str> = permissions.iter().map(Permission::as_str).collect();
    Ok(serde_json::to_string(&identifiers)?)
}

/// New group database payload.
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub permissions: BTreeSet<Permission>,
}

/// Update payload for an existing group. Absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateGroup {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<BTreeSet<Permission>>,
}

#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn create_group(&self, group: NewGroup) -> Result<Group>;
    async fn get_group(&self, id: &GroupId) -> Result<Option<Group>>;
    async fn get_group_by_name(&self, name: &str) -> Result<Option<Group>>;
    async fn list_groups(&self, page: &ResolvedPage) -> Result<Vec<Group>>;
    async fn count_groups(&self) -> Result<i64>;
    async fn update_group(&self, id: &GroupId, update: UpdateGroup) -> Result<Group>;
    async fn delete_group(&self, id: &GroupId) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SqlxGroupRepository {
    pool: DbPool,
}

impl SqlxGroupRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Translate constraint failures into domain conflicts.
pub(crate) fn map_write_error(err: sqlx::Error, resource_type: &str, context: &str) -> AuthgateError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AuthgateError::conflict(
                format!("{} already exists", resource_type),
                resource_type,
            );
        }
        if db_err.is_foreign_key_violation() {
            return AuthgateError::conflict(
                format!("{} is still referenced", resource_type),
                resource_type,
            );
        }
    }
    AuthgateError::database(err, context)
}

#[async_trait]
impl GroupRepository for SqlxGroupRepository {
    #[instrument(skip(self, group), fields(group_name = %group.name), name = "db_create_group")]
    async fn create_group(&self, group: NewGroup) -> Result<Group> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO groups (id, name, description, permissions, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&group.id)
        .bind(&group.name)
        .bind(&group.description)
        .bind(encode_permissions(&group.permissions)?)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|err| map_write_error(err, "group", "Failed to insert group"))?;

        self.get_group(&group.id)
            .await?
            .ok_or_else(|| AuthgateError::internal("Group vanished after insert"))
    }

    #[instrument(skip(self), fields(group_id = %id), name = "db_get_group")]
    async fn get_group(&self, id: &GroupId) -> Result<Option<Group>> {
        let row: Option<GroupRow> = sqlx::query_as(
            "SELECT id, name, description, permissions, created_at, updated_at FROM groups WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| AuthgateError::database(err, "Failed to fetch group by id"))?;

        row.map(Group::try_from).transpose()
    }

    #[instrument(skip(self), name = "db_get_group_by_name")]
    async fn get_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        let row: Option<GroupRow> = sqlx::query_as(
            "SELECT id, name, description, permissions, created_at, updated_at FROM groups WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| AuthgateError::database(err, "Failed to fetch group by name"))?;

        row.map(Group::try_from).transpose()
    }

    async fn list_groups(&self, page: &ResolvedPage) -> Result<Vec<Group>> {
        // Column and direction come from a whitelist, never from raw input.
        let sql = format!(
            "SELECT id, name, description, permissions, created_at, updated_at FROM groups \
             ORDER BY {} {}, id ASC LIMIT $1 OFFSET $2",
            page.column,
            page.order.as_sql()
        );

        let rows: Vec<GroupRow> = sqlx::query_as(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(|err| AuthgateError::database(err, "Failed to list groups"))?;

        rows.into_iter().map(Group::try_from).collect()
    }

    async fn count_groups(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM groups")
            .fetch_one(&self.pool)
            .await
            .map_err(|err| AuthgateError::database(err, "Failed to count groups"))
    }

    #[instrument(skip(self, update), fields(group_id = %id), name = "db_update_group")]
    async fn update_group(&self, id: &GroupId, update: UpdateGroup) -> Result<Group> {
        let current = self
            .get_group(id)
            .await?
            .ok_or_else(|| AuthgateError::not_found("Group", id.as_str()))?;

        let name = update.name.unwrap_or(current.name);
        let description = update.description.unwrap_or(current.description);
        let permissions = update.permissions.unwrap_or(current.permissions);

        sqlx::query(
            "UPDATE groups SET name = $1, description = $2, permissions = $3, updated_at = $4 WHERE id = $5",
        )
        .bind(&name)
        .bind(&description)
        .bind(encode_permissions(&permissions)?)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|err| map_write_error(err, "group", "Failed to update group"))?;

        self.get_group(id).await?.ok_or_else(|| AuthgateError::not_found("Group", id.as_str()))
    }

    #[instrument(skip(self), fields(group_id = %id), name = "db_delete_group")]
    async fn delete_group(&self, id: &GroupId) -> Result<()> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| map_write_error(err, "group", "Failed to delete group"))?;

        if result.rows_affected() == 0 {
            return Err(AuthgateError::not_found("Group", id.as_str()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PageDefaults, PageRequest, SortOrder};
    use crate::storage::test_helpers::memory_pool;

    const DEFAULTS: PageDefaults = PageDefaults {
        size: 15,
        sort: "createdAt",
        order: SortOrder::Desc,
        sortable: &[("createdAt", "created_at"), ("name", "name")],
    };

    fn new_group(name: &str, permissions: &[Permission]) -> NewGroup {
        NewGroup {
            id: GroupId::new(),
            name: name.to_string(),
            description: format!("{name} group"),
            permissions: permissions.iter().copied().collect(),
        }
    }

    #[tokio::test]
    async fn create_and_fetch_round_trips_permissions() {
        let repo = SqlxGroupRepository::new(memory_pool().await);
        let created = repo
            .create_group(new_group("Managers", &[Permission::ManagerRead, Permission::ManagerCreate]))
            .await
            .unwrap();

        let fetched = repo.get_group_by_name("Managers").await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.permissions, created.permissions);
        assert_eq!(fetched.permissions.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_names_conflict() {
        let repo = SqlxGroupRepository::new(memory_pool().await);
        repo.create_group(new_group("Ops", &[])).await.unwrap();

        let err = repo.create_group(new_group("Ops", &[])).await.unwrap_err();
        assert!(matches!(err, AuthgateError::Conflict { .. }));
    }

    #[tokio::test]
    async fn update_replaces_only_given_fields() {
        let repo = SqlxGroupRepository::new(memory_pool().await);
        let group = repo.create_group(new_group("Reps", &[Permission::RepresentativeRead])).await.unwrap();

        let updated = repo
            .update_group(
                &group.id,
                UpdateGroup { description: Some("field reps".into()), ..Default::default() },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Reps");
        assert_eq!(updated.description, "field reps");
        assert_eq!(updated.permissions, group.permissions);
    }

    #[tokio::test]
    async fn list_pages_and_counts() {
        let repo = SqlxGroupRepository::new(memory_pool().await);
        for name in ["Alpha", "Bravo", "Charlie"] {
            repo.create_group(new_group(name, &[])).await.unwrap();
        }

        let resolved = PageRequest::new(0, 2).sorted("name", SortOrder::Asc).resolve(&DEFAULTS).unwrap();
        let page = repo.list_groups(&resolved).await.unwrap();
        assert_eq!(page.iter().map(|g| g.name.as_str()).collect::<Vec<_>>(), vec!["Alpha", "Bravo"]);
        assert_eq!(repo.count_groups().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn corrupt_permissions_surface_as_errors() {
        let pool = memory_pool().await;
        let repo = SqlxGroupRepository::new(pool.clone());
        let group = repo.create_group(new_group("Broken", &[])).await.unwrap();

        sqlx::query("UPDATE groups SET permissions = '[\"admin:fly\"]' WHERE id = $1")
            .bind(&group.id)
            .execute(&pool)
            .await
            .unwrap();

        let err = repo.get_group(&group.id).await.unwrap_err();
        assert!(matches!(err, AuthgateError::PermissionParsing { .. }));
    }

    #[tokio::test]
    async fn delete_missing_group_is_not_found() {
        let repo = SqlxGroupRepository::new(memory_pool().await);
        let err = repo.delete_group(&GroupId::new()).await.unwrap_err();
        assert!(matches!(err, AuthgateError::NotFound { .. }));
    }
}
