//! # Configuration Settings
//!
//! Defines the configuration structure for authgate.

use crate::errors::{AuthgateError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    #[validate(nested)]
    pub server: ServerConfig,

    /// Database configuration
    #[validate(nested)]
    pub database: DatabaseConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,

    /// Authentication configuration
    #[validate(nested)]
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(AuthgateError::from)?;
        self.validate_custom()?;
        Ok(())
    }

    /// Checks that span more than one field
    fn validate_custom(&self) -> Result<()> {
        if !self.database.is_sqlite() {
            return Err(AuthgateError::validation("Database URL must start with 'sqlite:'"));
        }

        if self.auth.jwt_secret.len() < 32 {
            return Err(AuthgateError::validation(
                "JWT secret must be at least 32 characters long",
            ));
        }

        if self.auth.refresh_token_ttl_seconds <= self.auth.access_token_ttl_seconds {
            return Err(AuthgateError::validation(
                "Refresh token lifetime must exceed access token lifetime",
            ));
        }

        if !self.auth.public_path_prefix.starts_with('/') {
            return Err(AuthgateError::validation_field(
                "Public path prefix must start with '/'",
                "public_path_prefix",
            ));
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    #[validate(length(min = 1, message = "Host cannot be empty"))]
    pub host: String,

    /// Server port
    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080 }
    }
}

impl ServerConfig {
    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Maximum number of connections in the pool
    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[validate(range(min = 0, max = 50, message = "Min connections must be between 0 and 50"))]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[validate(range(
        min = 1,
        max = 60,
        message = "Connect timeout must be between 1 and 60 seconds"
    ))]
    pub connect_timeout_seconds: u64,

    /// Idle timeout in seconds (0 = no timeout)
    pub idle_timeout_seconds: u64,

    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/authgate.db".to_string(),
            max_connections: 10,
            min_connections: 0,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 600,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get idle timeout as Duration (None if 0)
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_seconds))
        }
    }

    /// Check if this is a SQLite configuration
    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }
}

/// Observability configuration for logging and metrics
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable metrics collection
    pub enable_metrics: bool,

    /// Metrics server port (0 = disabled)
    pub metrics_port: u16,

    /// Service name attached to log output
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            enable_metrics: false,
            metrics_port: 9090,
            service_name: "authgate".to_string(),
            log_level: "info".to_string(),
            json_logging: false,
        }
    }
}

impl ObservabilityConfig {
    /// Get metrics bind address (None if disabled)
    pub fn metrics_bind_address(&self) -> Option<String> {
        if !self.enable_metrics || self.metrics_port == 0 {
            None
        } else {
            Some(format!("0.0.0.0:{}", self.metrics_port))
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for token signing/verification
    #[validate(length(min = 1, message = "JWT secret cannot be empty"))]
    pub jwt_secret: String,

    /// JWT issuer
    #[validate(length(min = 1, message = "JWT issuer cannot be empty"))]
    pub jwt_issuer: String,

    /// Access token lifetime in seconds
    #[validate(range(
        min = 60,
        max = 86400,
        message = "Access token lifetime must be between 1 minute and 24 hours"
    ))]
    pub access_token_ttl_seconds: i64,

    /// Refresh token lifetime in seconds
    #[validate(range(
        min = 300,
        max = 7776000,
        message = "Refresh token lifetime must be between 5 minutes and 90 days"
    ))]
    pub refresh_token_ttl_seconds: i64,

    /// Requests under this path skip the authentication filter
    pub public_path_prefix: String,

    /// Password for the seeded `admin` user. No admin is seeded when unset.
    pub bootstrap_admin_password: Option<String>,

    /// Email for the seeded `admin` user
    #[validate(email)]
    pub bootstrap_admin_email: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "authgate-default-secret-please-change-in-production".to_string(),
            jwt_issuer: "authgate".to_string(),
            access_token_ttl_seconds: crate::auth::jwt::DEFAULT_ACCESS_TTL_SECONDS,
            refresh_token_ttl_seconds: crate::auth::jwt::DEFAULT_REFRESH_TTL_SECONDS,
            public_path_prefix: "/api/v1/auth".to_string(),
            bootstrap_admin_password: None,
            bootstrap_admin_email: "admin@authgate.local".to_string(),
        }
    }
}
