//! # Storage and Persistence
//!
//! SQLite connectivity, embedded migrations and the repositories backing
//! users, groups, issued tokens and the audit log.

pub mod migrations;
pub mod pool;
pub mod repositories;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use crate::config::DatabaseConfig;

pub use migrations::{list_applied_migrations, run_migrations, validate_migrations, MigrationInfo};
pub use pool::{create_pool, DbPool};
pub use repositories::{
    AuditEvent, AuditLogRepository, GroupRepository, SqlxGroupRepository, SqlxTokenRepository,
    SqlxUserRepository, TokenRepository, UserRepository,
};

use crate::errors::{AuthgateError, Result};

/// Check database connectivity
pub async fn check_connection(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(|e| AuthgateError::database(e, "Database connectivity check failed"))?;

    Ok(())
}
