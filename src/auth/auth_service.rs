//! Login, refresh and bearer resolution on top of persisted token records.

use std::sync::{Arc, LazyLock};

use tracing::{debug, field, info, instrument, warn};
use validator::Validate;

use crate::auth::{
    hashing,
    jwt::{JwtService, TokenKind},
    models::{AuthContext, AuthError, NewToken, TokenRecord, TokenStatus},
    user::{AuthenticationRequest, AuthenticationResponse, User},
};
use crate::errors::{AuthErrorType, Error, Result};
use crate::observability::metrics;
use crate::storage::repositories::{
    AuditEvent, AuditLogRepository, SqlxTokenRepository, SqlxUserRepository, TokenRepository,
    UserRepository,
};
use crate::storage::DbPool;

/// Scheme prefix of the `Authorization` header, trailing space included.
pub const BEARER_PREFIX: &str = "Bearer ";

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Verified against for unknown users so the response time does not reveal
/// whether the account exists.
static DUMMY_HASH: LazyLock<String> = LazyLock::new(|| {
    hashing::hash_password("dummy_startup_value")
        .unwrap_or_else(|_| "$argon2id$v=19$m=768,t=1,p=1$dW5rbm93bg$dW5rbm93bg".to_string())
});

/// Token carried by an `Authorization` header, if it uses the bearer scheme.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .filter(|token| !token.is_empty())
}

/// How a bearer token resolved against the credential store.
#[derive(Debug, Clone)]
pub enum BearerResolution {
    Authenticated(AuthContext),
    /// Signature did not verify or the token could not be decoded.
    Undecodable,
    /// The subject names no stored user.
    UnknownSubject(String),
    /// Decoded and the user exists, but the token does not authenticate.
    Rejected { username: String, reason: &'static str },
}

#[derive(Clone)]
pub struct AuthenticationService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenRepository>,
    audit_repository: Arc<AuditLogRepository>,
    jwt: JwtService,
}

impl AuthenticationService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenRepository>,
        audit_repository: Arc<AuditLogRepository>,
        jwt: JwtService,
    ) -> Self {
        Self { users, tokens, audit_repository, jwt }
    }

    pub fn with_sqlx(pool: DbPool, jwt: JwtService) -> Self {
        Self::new(
            Arc::new(SqlxUserRepository::new(pool.clone())),
            Arc::new(SqlxTokenRepository::new(pool.clone())),
            Arc::new(AuditLogRepository::new(pool)),
            jwt,
        )
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// Verify credentials and issue a fresh token pair.
    ///
    /// Every previously active token of the user is revoked before the new
    /// access token is stored, so a user holds at most one active session.
    #[instrument(skip(self, request), fields(username = %request.username, user_id = field::Empty))]
    pub async fn authenticate(&self, request: &AuthenticationRequest) -> Result<AuthenticationResponse> {
        request.validate()?;

        let (user, password_hash) =
            match self.users.get_user_with_password(request.username.trim()).await? {
                Some(found) => found,
                None => {
                    if let Err(e) = hashing::verify_password(&request.password, &DUMMY_HASH) {
                        warn!(error = %e, "dummy hash verification failed unexpectedly");
                    }
                    warn!("login attempt for non-existent user");
                    metrics::record_authentication("invalid_credentials").await;
                    self.audit_login_failure(None, &request.username, "unknown_user").await?;
                    return Err(Error::auth(INVALID_CREDENTIALS, AuthErrorType::InvalidCredentials));
                }
            };
        tracing::Span::current().record("user_id", field::display(&user.id));

        if !hashing::verify_password(&request.password, &password_hash)? {
            warn!(user_id = %user.id, "login attempt with incorrect password");
            metrics::record_authentication("invalid_credentials").await;
            self.audit_login_failure(Some(&user), &user.username, "invalid_password").await?;
            return Err(Error::auth(INVALID_CREDENTIALS, AuthErrorType::InvalidCredentials));
        }

        if !user.enabled {
            warn!(user_id = %user.id, "login attempt for disabled account");
            metrics::record_authentication("account_disabled").await;
            self.audit_login_failure(Some(&user), &user.username, "account_disabled").await?;
            return Err(Error::auth("User account is disabled", AuthErrorType::AccountDisabled));
        }

        if user.expired {
            warn!(user_id = %user.id, "login attempt for expired account");
            metrics::record_authentication("account_expired").await;
            self.audit_login_failure(Some(&user), &user.username, "account_expired").await?;
            return Err(Error::auth("User account has expired", AuthErrorType::AccountExpired));
        }

        let access_token = self.jwt.generate_access_token(&user)?;
        let refresh_token = self.jwt.generate_refresh_token(&user)?;

        let revoked = self.revoke_all_user_tokens(&user).await?;
        self.tokens.save_token(NewToken::bearer(access_token.clone(), user.id.clone())).await?;
        self.tokens.save_token(NewToken::refresh(refresh_token.clone(), user.id.clone())).await?;

        metrics::record_authentication("success").await;
        metrics::record_token_issued(TokenKind::Access.to_string().as_str()).await;
        metrics::record_token_issued(TokenKind::Refresh.to_string().as_str()).await;

        self.audit_repository
            .record_auth_event(
                AuditEvent::auth(
                    "auth.login.success",
                    Some(user.id.as_str()),
                    Some(&user.username),
                    serde_json::json!({ "revoked_tokens": revoked, "group": user.group.name }),
                )
                .with_user(user.id.to_string()),
            )
            .await?;

        info!(user_id = %user.id, revoked_tokens = revoked, "user authenticated");

        Ok(AuthenticationResponse { access_token, refresh_token })
    }

    /// Move every active token of `user`, access and refresh alike, to
    /// revoked in one batch. Returns the number of tokens revoked.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn revoke_all_user_tokens(&self, user: &User) -> Result<u64> {
        self.revoke_user_tokens(user, None).await
    }

    /// Issue a new access token from the refresh token in `header`.
    ///
    /// A missing or non-bearer header, or a token whose subject cannot be
    /// decoded, yields `Ok(None)` and leaves the store untouched.
    #[instrument(skip(self, header), fields(username = field::Empty))]
    pub async fn refresh_token(&self, header: Option<&str>) -> Result<Option<AuthenticationResponse>> {
        let Some(refresh_token) = bearer_token(header) else {
            return Ok(None);
        };
        let Some(username) = self.jwt.extract_username(refresh_token) else {
            debug!("refresh token subject could not be decoded");
            return Ok(None);
        };
        tracing::Span::current().record("username", field::display(&username));

        let user = self
            .users
            .get_user_by_username(&username)
            .await?
            .ok_or_else(|| Error::not_found("User", username.clone()))?;

        let is_refresh = self
            .jwt
            .extract_claims(refresh_token)
            .map(|claims| claims.typ == TokenKind::Refresh)
            .unwrap_or(false);
        if !is_refresh || !self.jwt.is_token_valid(refresh_token, &user) {
            warn!(user_id = %user.id, "refresh attempted with an invalid refresh token");
            return Err(Error::auth("Invalid or expired refresh token", AuthErrorType::InvalidToken));
        }

        let record = self.tokens.find_by_token(refresh_token).await?;
        if !record.is_some_and(|record| record.authenticates(&user.id, TokenKind::Refresh)) {
            warn!(user_id = %user.id, "refresh attempted with a superseded refresh token");
            return Err(Error::auth("Invalid or expired refresh token", AuthErrorType::InvalidToken));
        }

        if !user.can_authenticate() {
            warn!(user_id = %user.id, "refresh attempted for a blocked account");
            let error_type = if user.enabled {
                AuthErrorType::AccountExpired
            } else {
                AuthErrorType::AccountDisabled
            };
            return Err(Error::auth("User account cannot authenticate", error_type));
        }

        let access_token = self.jwt.generate_access_token(&user)?;
        let revoked = self.revoke_user_tokens(&user, Some(TokenKind::Access)).await?;
        self.tokens.save_token(NewToken::bearer(access_token.clone(), user.id.clone())).await?;
        metrics::record_token_issued(TokenKind::Access.to_string().as_str()).await;

        self.audit_repository
            .record_auth_event(
                AuditEvent::auth(
                    "auth.token.refreshed",
                    Some(user.id.as_str()),
                    Some(&user.username),
                    serde_json::json!({ "revoked_tokens": revoked }),
                )
                .with_user(user.id.to_string()),
            )
            .await?;

        info!(user_id = %user.id, "access token refreshed");

        Ok(Some(AuthenticationResponse {
            access_token,
            refresh_token: refresh_token.to_string(),
        }))
    }

    /// Resolve a bearer token to the identity it authenticates.
    ///
    /// Store failures surface as [`AuthError::Persistence`]; every other
    /// outcome is a [`BearerResolution`]. An access token past its expiry
    /// whose record is still active has that record moved to expired.
    #[instrument(skip(self, token), fields(username = field::Empty))]
    pub async fn resolve_bearer(&self, token: &str) -> std::result::Result<BearerResolution, AuthError> {
        let Some(username) = self.jwt.extract_username(token) else {
            return Ok(BearerResolution::Undecodable);
        };
        tracing::Span::current().record("username", field::display(&username));

        let Some(user) = self.users.get_user_by_username(&username).await? else {
            return Ok(BearerResolution::UnknownSubject(username));
        };

        let record = self.tokens.find_by_token(token).await?;
        let Some(record) = record.filter(TokenRecord::is_valid) else {
            return Ok(BearerResolution::Rejected { username, reason: "token_not_active" });
        };
        if record.user_id != user.id {
            warn!(user_id = %user.id, token_owner = %record.user_id, "token record belongs to another user");
            return Ok(BearerResolution::Rejected { username, reason: "token_owner_mismatch" });
        }

        let is_access = self
            .jwt
            .extract_claims(token)
            .map(|claims| claims.typ == TokenKind::Access)
            .unwrap_or(false);
        if !is_access || record.kind != TokenKind::Access {
            return Ok(BearerResolution::Rejected { username, reason: "not_an_access_token" });
        }

        if !self.jwt.is_token_valid(token, &user) {
            if self.jwt.is_expired(token) {
                self.expire_record(&record).await?;
            }
            return Ok(BearerResolution::Rejected { username, reason: "token_invalid" });
        }

        Ok(BearerResolution::Authenticated(AuthContext::new(
            user.id.clone(),
            user.username.clone(),
            user.authorities(),
        )))
    }

    async fn expire_record(&self, record: &TokenRecord) -> Result<()> {
        let moved = self.tokens.update_status(std::slice::from_ref(&record.id), TokenStatus::Expired).await?;
        if moved > 0 {
            metrics::record_token_expired().await;
            debug!(token_id = %record.id, "token record marked expired");
        }
        Ok(())
    }

    async fn revoke_user_tokens(&self, user: &User, kind: Option<TokenKind>) -> Result<u64> {
        let revoked = self.tokens.revoke_active_for_user(&user.id, kind).await?;
        if revoked == 0 {
            return Ok(0);
        }
        metrics::record_tokens_revoked(revoked).await;

        self.audit_repository
            .record_auth_event(
                AuditEvent::auth(
                    "auth.token.revoked",
                    Some(user.id.as_str()),
                    Some(&user.username),
                    serde_json::json!({
                        "count": revoked,
                        "kind": kind.map_or("all", |kind| kind.as_str()),
                    }),
                )
                .with_user(user.id.to_string()),
            )
            .await?;

        debug!(revoked, "revoked outstanding tokens");
        Ok(revoked)
    }

    async fn audit_login_failure(&self, user: Option<&User>, login: &str, reason: &str) -> Result<()> {
        let mut event = AuditEvent::auth(
            "auth.login.failed",
            user.map(|u| u.id.as_str()),
            Some(login),
            serde_json::json!({ "reason": reason }),
        );
        if let Some(user) = user {
            event = event.with_user(user.id.to_string());
        }
        self.audit_repository.record_auth_event(event).await
    }
}
