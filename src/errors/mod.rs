//! # Error Handling
//!
//! Domain errors for authgate. HTTP translation lives in `api::error`.

pub mod types;

pub use types::{AuthErrorType, AuthgateError, Result};

/// Short alias used across the crate
pub type Error = AuthgateError;
