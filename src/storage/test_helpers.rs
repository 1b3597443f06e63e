//! Test database utilities for in-library tests.
//!
//! Every pool is a private in-memory SQLite database pinned to a single
//! connection, so tests are fully isolated from one another.

use crate::config::DatabaseConfig;
use crate::storage::{create_pool, DbPool};

fn memory_config(auto_migrate: bool) -> DatabaseConfig {
    DatabaseConfig { url: "sqlite::memory:".to_string(), auto_migrate, ..Default::default() }
}

/// In-memory pool with every migration applied.
pub async fn memory_pool() -> DbPool {
    create_pool(&memory_config(true)).await.expect("in-memory pool with migrations")
}

/// In-memory pool without any schema.
pub async fn unmigrated_pool() -> DbPool {
    create_pool(&memory_config(false)).await.expect("in-memory pool")
}
