//! # Authgate
//!
//! Authgate is a JWT authentication service over users and groups. Users log
//! in with a username and password, receive an access and refresh token pair,
//! and present the access token as a bearer credential on every protected
//! request. Groups carry the permissions that guard the admin endpoints.
//!
//! ## Architecture
//!
//! ```text
//! HTTP API (axum) → Request Authentication Filter → Permission Guards → Handlers
//!                                  ↓                                       ↓
//!                       Token Service (jsonwebtoken)     User / Group / Authentication services
//!                                                                           ↓
//!                                                           Credential Store (sqlx + SQLite)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use authgate::{api::start_api_server, config::AppConfig, storage::create_pool, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::load(None)?;
//!     let pool = create_pool(&config.database).await?;
//!     start_api_server(&config, pool).await
//! }
//! ```

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod storage;

pub use config::AppConfig;
pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
