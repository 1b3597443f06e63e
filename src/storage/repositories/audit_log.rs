//! Audit log repository for authentication events.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::errors::{AuthgateError, Result};
use crate::storage::DbPool;

/// Audit event descriptor for authentication activity logging.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action: String,
    pub resource_id: Option<String>,
    pub resource_name: Option<String>,
    pub user_id: Option<String>,
    pub metadata: serde_json::Value,
}

impl AuditEvent {
    pub fn auth(
        action: &str,
        resource_id: Option<&str>,
        resource_name: Option<&str>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            action: action.to_string(),
            resource_id: resource_id.map(|value| value.to_string()),
            resource_name: resource_name.map(|value| value.to_string()),
            user_id: None,
            metadata,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// A stored audit log entry.
#[derive(Debug, Clone, FromRow)]
pub struct AuditLogEntry {
    pub id: i64,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub resource_name: String,
    pub action: String,
    pub metadata: Option<String>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    pool: DbPool,
}

impl AuditLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn record_event(&self, resource_type: &str, event: AuditEvent) -> Result<()> {
        let metadata_json = serde_json::to_string(&event.metadata).map_err(|err| {
            AuthgateError::validation(format!("Invalid audit metadata JSON: {}", err))
        })?;
        let resource_name = event.resource_name.unwrap_or_else(|| event.action.clone());

        sqlx::query(
            "INSERT INTO audit_log (resource_type, resource_id, resource_name, action, metadata, user_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(resource_type)
        .bind(event.resource_id.as_deref())
        .bind(&resource_name)
        .bind(event.action.as_str())
        .bind(metadata_json)
        .bind(event.user_id.as_deref())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| AuthgateError::database(err, "Failed to write authentication audit event"))?;

        Ok(())
    }

    /// Record an authentication-related audit event.
    pub async fn record_auth_event(&self, event: AuditEvent) -> Result<()> {
        self.record_event("auth.token", event).await
    }

    /// Record a user or group management event.
    pub async fn record_admin_event(&self, event: AuditEvent) -> Result<()> {
        self.record_event("admin.identity", event).await
    }

    /// Most recent entries for `action`, newest first.
    pub async fn list_by_action(&self, action: &str, limit: i64) -> Result<Vec<AuditLogEntry>> {
        sqlx::query_as(
            "SELECT id, resource_type, resource_id, resource_name, action, metadata, user_id, created_at \
             FROM audit_log WHERE action = $1 ORDER BY id DESC LIMIT $2",
        )
        .bind(action)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| AuthgateError::database(err, "Failed to list audit events"))
    }
}
