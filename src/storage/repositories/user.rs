//! User repository.
//!
//! Users are always loaded joined with their group so the authorities a user
//! holds are available without a second lookup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::instrument;

use super::group::{decode_permissions, map_write_error};
use crate::auth::user::{NewUser, UpdateUser, User};
use crate::domain::{Group, GroupId, ResolvedPage, UserId};
use crate::errors::{AuthgateError, Result};
use crate::storage::DbPool;

const USER_SELECT: &str = "SELECT u.id, u.first_name, u.last_name, u.username, u.email, \
     u.password_hash, u.enabled, u.expired, u.created_at, u.updated_at, \
     g.id AS group_id, g.name AS group_name, g.description AS group_description, \
     g.permissions AS group_permissions, g.created_at AS group_created_at, \
     g.updated_at AS group_updated_at \
     FROM users u JOIN groups g ON g.id = u.group_id";

#[derive(Debug, Clone, FromRow)]
struct UserRow {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub enabled: bool,
    pub expired: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub group_id: String,
    pub group_name: String,
    pub group_description: String,
    pub group_permissions: String,
    pub group_created_at: DateTime<Utc>,
    pub group_updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user_with_password(self) -> Result<(User, String)> {
        let group = Group {
            id: GroupId::from_string(self.group_id),
            name: self.group_name,
            description: self.group_description,
            permissions: decode_permissions(&self.group_permissions)?,
            created_at: self.group_created_at,
            updated_at: self.group_updated_at,
        };

        let user = User {
            id: UserId::from_string(self.id),
            first_name: self.first_name,
            last_name: self.last_name,
            username: self.username,
            email: self.email,
            enabled: self.enabled,
            expired: self.expired,
            group,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };

        Ok((user, self.password_hash))
    }

    fn into_user(self) -> Result<User> {
        self.into_user_with_password().map(|(user, _)| user)
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create_user(&self, user: NewUser) -> Result<User>;

    /// Get a user by ID
    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;

    /// Get a user by username
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get a user by email
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Get a user and password hash by username, falling back to email
    async fn get_user_with_password(&self, login: &str) -> Result<Option<(User, String)>>;

    /// List users one page at a time
    async fn list_users(&self, page: &ResolvedPage) -> Result<Vec<User>>;

    /// Count total users
    async fn count_users(&self) -> Result<i64>;

    /// Update profile fields
    async fn update_user(&self, id: &UserId, update: UpdateUser) -> Result<User>;

    /// Move a user to another group
    async fn assign_group(&self, id: &UserId, group_id: &GroupId) -> Result<User>;

    /// Delete a user together with its token records
    async fn delete_user(&self, id: &UserId) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SqlxUserRepository {
    pool: DbPool,
}

impl SqlxUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, clause: &str, value: &str, context: &str) -> Result<Option<UserRow>> {
        let sql = format!("{USER_SELECT} WHERE {clause} = $1");
        sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| AuthgateError::database(err, context))
    }

    async fn require_user(&self, id: &UserId) -> Result<User> {
        self.get_user(id).await?.ok_or_else(|| AuthgateError::not_found("User", id.as_str()))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    #[instrument(skip(self, user), fields(username = %user.username), name = "db_create_user")]
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO users (id, first_name, last_name, username, email, password_hash, enabled, expired, group_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.enabled)
        .bind(user.expired)
        .bind(&user.group_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|err| map_write_error(err, "user", "Failed to insert user"))?;

        self.require_user(&user.id).await
    }

    #[instrument(skip(self), fields(user_id = %id), name = "db_get_user")]
    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        self.fetch_one_where("u.id", id.as_str(), "Failed to fetch user by id")
            .await?
            .map(UserRow::into_user)
            .transpose()
    }

    #[instrument(skip(self), name = "db_get_user_by_username")]
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.fetch_one_where("u.username", username, "Failed to fetch user by username")
            .await?
            .map(UserRow::into_user)
            .transpose()
    }

    #[instrument(skip(self), name = "db_get_user_by_email")]
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = User::normalize_email(email);
        self.fetch_one_where("u.email", &email, "Failed to fetch user by email")
            .await?
            .map(UserRow::into_user)
            .transpose()
    }

    #[instrument(skip(self), name = "db_get_user_with_password")]
    async fn get_user_with_password(&self, login: &str) -> Result<Option<(User, String)>> {
        let row = match self
            .fetch_one_where("u.username", login, "Failed to fetch user credentials")
            .await?
        {
            Some(row) => Some(row),
            None => {
                let email = User::normalize_email(login);
                self.fetch_one_where("u.email", &email, "Failed to fetch user credentials").await?
            }
        };

        row.map(UserRow::into_user_with_password).transpose()
    }

    async fn list_users(&self, page: &ResolvedPage) -> Result<Vec<User>> {
        // Column and direction come from a whitelist, never from raw input.
        let sql = format!(
            "{USER_SELECT} ORDER BY {} {}, u.id ASC LIMIT $1 OFFSET $2",
            page.column,
            page.order.as_sql()
        );

        let rows: Vec<UserRow> = sqlx::query_as(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(|err| AuthgateError::database(err, "Failed to list users"))?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    async fn count_users(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|err| AuthgateError::database(err, "Failed to count users"))
    }

    #[instrument(skip(self, update), fields(user_id = %id), name = "db_update_user")]
    async fn update_user(&self, id: &UserId, update: UpdateUser) -> Result<User> {
        let current = self.require_user(id).await?;

        sqlx::query(
            "UPDATE users SET first_name = $1, last_name = $2, username = $3, updated_at = $4 WHERE id = $5",
        )
        .bind(update.first_name.unwrap_or(current.first_name))
        .bind(update.last_name.unwrap_or(current.last_name))
        .bind(update.username.unwrap_or(current.username))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|err| map_write_error(err, "user", "Failed to update user"))?;

        self.require_user(id).await
    }

    #[instrument(skip(self), fields(user_id = %id, group_id = %group_id), name = "db_assign_group")]
    async fn assign_group(&self, id: &UserId, group_id: &GroupId) -> Result<User> {
        let result = sqlx::query("UPDATE users SET group_id = $1, updated_at = $2 WHERE id = $3")
            .bind(group_id)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| map_write_error(err, "user", "Failed to assign group"))?;

        if result.rows_affected() == 0 {
            return Err(AuthgateError::not_found("User", id.as_str()));
        }
        self.require_user(id).await
    }

    #[instrument(skip(self), fields(user_id = %id), name = "db_delete_user")]
    async fn delete_user(&self, id: &UserId) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| AuthgateError::database(err, "Failed to delete user"))?;

        if result.rows_affected() == 0 {
            return Err(AuthgateError::not_found("User", id.as_str()));
        }
        Ok(())
    }
}
