//! Authentication and authorization module entry point.
//!
//! This module exposes the identity stack for authgate: JWT minting and
//! verification, the credential store services, the request filter, and the
//! permission guards built on top of it.

pub mod auth_service;
pub mod authorization;
pub mod bootstrap;
pub mod group_service;
pub(crate) mod hashing;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod user;
pub mod user_service;
pub mod validation;

pub use auth_service::{AuthenticationService, BearerResolution};
pub use group_service::GroupService;
pub use jwt::{Claims, JwtService, TokenKind};
pub use models::{AuthContext, AuthError, TokenRecord, TokenStatus, TokenType};
pub use user::{AuthenticationRequest, AuthenticationResponse, User};
pub use user_service::UserService;
