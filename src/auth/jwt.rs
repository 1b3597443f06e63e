//! JWT utilities for signing and verifying access and refresh tokens.
//!
//! The token service is stateless: it knows nothing about persisted token
//! records. Revocation is the authentication service's concern.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::auth::models::TokenFieldParseError;
use crate::auth::user::User;
use crate::config::AuthConfig;
use crate::errors::{Error, Result};

/// Default access token lifetime (1 hour)
pub const DEFAULT_ACCESS_TTL_SECONDS: i64 = 3600;

/// Default refresh token lifetime (7 days)
pub const DEFAULT_REFRESH_TTL_SECONDS: i64 = 7 * 24 * 3600;

/// Which half of a token pair a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = TokenFieldParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "access" => Ok(TokenKind::Access),
            "refresh" => Ok(TokenKind::Refresh),
            other => Err(TokenFieldParseError::new("kind", other)),
        }
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub typ: TokenKind,
    /// Random id so two tokens minted in the same second never collide.
    pub jti: String,
}

/// Signs and verifies JWTs with a process-wide HMAC secret.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl fmt::Debug for JwtService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    /// Create a token service with the default lifetimes.
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            access_ttl: Duration::seconds(DEFAULT_ACCESS_TTL_SECONDS),
            refresh_ttl: Duration::seconds(DEFAULT_REFRESH_TTL_SECONDS),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.jwt_secret.as_bytes(), config.jwt_issuer.clone())
            .with_ttls(
                Duration::seconds(config.access_token_ttl_seconds),
                Duration::seconds(config.refresh_token_ttl_seconds),
            )
    }

    pub fn with_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    pub fn generate_access_token(&self, user: &User) -> Result<String> {
        self.generate_token(&user.username, TokenKind::Access)
    }

    pub fn generate_refresh_token(&self, user: &User) -> Result<String> {
        self.generate_token(&user.username, TokenKind::Refresh)
    }

    /// Mint a token of `kind` for `username`.
    pub fn generate_token(&self, username: &str, kind: TokenKind) -> Result<String> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };

        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: self.issuer.clone(),
            typ: kind,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| Error::internal(format!("Failed to sign {} token: {}", kind, err)))
    }

    /// Signature-checked subject. Expired tokens still yield their subject.
    pub fn extract_username(&self, token: &str) -> Option<String> {
        self.extract_claims(token).map(|claims| claims.sub)
    }

    /// Signature-checked claims without judging expiry.
    pub fn extract_claims(&self, token: &str) -> Option<Claims> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation(false)) {
            Ok(data) => Some(data.claims),
            Err(err) => {
                tracing::debug!(error = ?err.kind(), "rejected undecodable token");
                None
            }
        }
    }

    /// True only when the signature verifies, the subject is `user` and the
    /// token has not expired. Any decoding problem yields false.
    pub fn is_token_valid(&self, token: &str, user: &User) -> bool {
        self.is_token_valid_for(token, &user.username)
    }

    pub fn is_token_valid_for(&self, token: &str, username: &str) -> bool {
        match decode::<Claims>(token, &self.decoding_key, &self.validation(true)) {
            Ok(data) => data.claims.sub == username && data.claims.exp > Utc::now().timestamp(),
            Err(err) => {
                if matches!(err.kind(), ErrorKind::ExpiredSignature) {
                    tracing::debug!(username = %username, "token expired");
                }
                false
            }
        }
    }

    /// True when the token's signature verifies but its expiry has passed.
    pub fn is_expired(&self, token: &str) -> bool {
        self.extract_claims(token)
            .map(|claims| claims.exp <= Utc::now().timestamp())
            .unwrap_or(false)
    }

    fn validation(&self, validate_exp: bool) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = validate_exp;
        validation.leeway = 0;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation
    }
}
