pub mod auth;
pub mod groups;
pub mod health;
pub mod users;

pub use auth::{authenticate_handler, refresh_token_handler};
pub use health::health_handler;
