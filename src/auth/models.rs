//! Data models for issued tokens and the request-scoped identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

use crate::auth::jwt::TokenKind;
use crate::domain::{TokenId, UserId, ROLE_PREFIX};
use crate::errors::Error;

/// Lifecycle status for an issued token. Only `Active` tokens authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenStatus {
    Active,
    Revoked,
    Expired,
}

impl TokenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStatus::Active => "active",
            TokenStatus::Revoked => "revoked",
            TokenStatus::Expired => "expired",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, TokenStatus::Active)
    }
}

impl Display for TokenStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TokenStatus {
    type Err = TokenFieldParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TokenStatus::Active),
            "revoked" => Ok(TokenStatus::Revoked),
            "expired" => Ok(TokenStatus::Expired),
            other => Err(TokenFieldParseError::new("status", other)),
        }
    }
}

/// A stored token column holding a value outside its enumeration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid token {field}: {value}")]
pub struct TokenFieldParseError {
    pub field: &'static str,
    pub value: String,
}

impl TokenFieldParseError {
    pub fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self { field, value: value.into() }
    }
}

/// Transport scheme of an issued token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenType {
    Bearer,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Bearer => "bearer",
        }
    }
}

impl FromStr for TokenType {
    type Err = TokenFieldParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bearer" => Ok(TokenType::Bearer),
            other => Err(TokenFieldParseError::new("type", other)),
        }
    }
}

/// Stored record of an issued access or refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub id: TokenId,
    pub token: String,
    pub token_type: TokenType,
    pub kind: TokenKind,
    pub status: TokenStatus,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn is_valid(&self) -> bool {
        self.status.is_active()
    }

    /// Whether this record may still authenticate `user_id` as a `kind` token.
    pub fn authenticates(&self, user_id: &UserId, kind: TokenKind) -> bool {
        self.is_valid() && self.kind == kind && &self.user_id == user_id
    }
}

/// New token database payload.
#[derive(Debug, Clone)]
pub struct NewToken {
    pub id: TokenId,
    pub token: String,
    pub token_type: TokenType,
    pub kind: TokenKind,
    pub status: TokenStatus,
    pub user_id: UserId,
}

impl NewToken {
    /// A freshly issued, active bearer access token for `user_id`.
    pub fn bearer(token: String, user_id: UserId) -> Self {
        Self::issued(token, user_id, TokenKind::Access)
    }

    /// A freshly issued, active refresh token for `user_id`.
    pub fn refresh(token: String, user_id: UserId) -> Self {
        Self::issued(token, user_id, TokenKind::Refresh)
    }

    fn issued(token: String, user_id: UserId, kind: TokenKind) -> Self {
        Self {
            id: TokenId::new(),
            token,
            token_type: TokenType::Bearer,
            kind,
            status: TokenStatus::Active,
            user_id,
        }
    }
}

/// Request-scoped identity established by the authentication filter.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: UserId,
    pub username: String,
    authorities: BTreeSet<String>,
}

impl AuthContext {
    pub fn new(user_id: UserId, username: String, authorities: BTreeSet<String>) -> Self {
        Self { user_id, username, authorities }
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }

    /// Checks for `ROLE_<role>`.
    pub fn has_role(&self, role: &str) -> bool {
        self.authorities.contains(&format!("{ROLE_PREFIX}{role}"))
    }

    pub fn authorities(&self) -> impl Iterator<Item = &String> {
        self.authorities.iter()
    }
}

/// Errors returned by authentication middleware.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unauthorized: authentication required")]
    Unauthenticated,
    #[error("forbidden: missing required authority")]
    Forbidden,
    #[error(transparent)]
    Persistence(#[from] Error),
}
