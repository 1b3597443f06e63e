//! # REST API
//!
//! HTTP surface of authgate: the public login and refresh endpoints, the
//! guarded user and group administration endpoints, and error translation.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::{build_router, ApiState};
pub use server::start_api_server;
