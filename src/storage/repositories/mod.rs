//! Repository traits and their SQLite implementations.

pub mod audit_log;
pub mod group;
pub mod token;
pub mod user;

pub use audit_log::{AuditEvent, AuditLogEntry, AuditLogRepository};
pub use group::{GroupRepository, NewGroup, SqlxGroupRepository, UpdateGroup};
pub use token::{SqlxTokenRepository, TokenRepository};
pub use user::{SqlxUserRepository, UserRepository};
