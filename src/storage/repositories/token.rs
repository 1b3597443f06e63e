//! Token repository for issued access and refresh tokens.
//!
//! Records are never deleted here; they only move from `active` to `revoked`
//! or `expired`.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use tracing::instrument;

use crate::auth::jwt::TokenKind;
use crate::auth::models::{NewToken, TokenRecord, TokenStatus, TokenType};
use crate::domain::{TokenId, UserId};
use crate::errors::{AuthgateError, Result};
use crate::storage::DbPool;

#[derive(Debug, Clone, FromRow)]
struct TokenRow {
    pub id: String,
    pub token: String,
    pub token_type: String,
    pub kind: String,
    pub status: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TokenRow> for TokenRecord {
    type Error = AuthgateError;

    fn try_from(row: TokenRow) -> Result<Self> {
        let status = TokenStatus::from_str(&row.status).map_err(|_| {
            AuthgateError::validation(format!(
                "Unknown token status '{}' for token {}",
                row.status, row.id
            ))
        })?;
        let token_type = TokenType::from_str(&row.token_type).map_err(|_| {
            AuthgateError::validation(format!(
                "Unknown token type '{}' for token {}",
                row.token_type, row.id
            ))
        })?;
        let kind = TokenKind::from_str(&row.kind).map_err(|_| {
            AuthgateError::validation(format!(
                "Unknown token kind '{}' for token {}",
                row.kind, row.id
            ))
        })?;

        Ok(TokenRecord {
            id: TokenId::from_string(row.id),
            token: row.token,
            token_type,
            kind,
            status,
            user_id: UserId::from_string(row.user_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn save_token(&self, token: NewToken) -> Result<TokenRecord>;
    async fn find_by_token(&self, token: &str) -> Result<Option<TokenRecord>>;
    /// Active tokens owned by `user_id`, of either kind.
    async fn find_valid_tokens_for_user(&self, user_id: &UserId) -> Result<Vec<TokenRecord>>;
    /// Move the given active tokens to `status` in one statement. Tokens that
    /// already left `active` are untouched. Returns the number of rows moved.
    async fn update_status(&self, ids: &[TokenId], status: TokenStatus) -> Result<u64>;
    async fn count_by_status(&self, status: TokenStatus) -> Result<i64>;

    /// Revoke the active tokens of `user_id`, limited to `kind` when given.
    /// Returns the number of tokens revoked.
    async fn revoke_active_for_user(&self, user_id: &UserId, kind: Option<TokenKind>) -> Result<u64> {
        let ids: Vec<TokenId> = self
            .find_valid_tokens_for_user(user_id)
            .await?
            .into_iter()
            .filter(|token| kind.map_or(true, |kind| token.kind == kind))
            .map(|token| token.id)
            .collect();
        self.update_status(&ids, TokenStatus::Revoked).await
    }
}

#[derive(Debug, Clone)]
pub struct SqlxTokenRepository {
    pool: DbPool,
}

impl SqlxTokenRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for SqlxTokenRepository {
    #[instrument(skip(self, token), fields(token_id = %token.id, user_id = %token.user_id), name = "db_save_token")]
    async fn save_token(&self, token: NewToken) -> Result<TokenRecord> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO tokens (id, token, token_type, kind, status, user_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&token.id)
        .bind(&token.token)
        .bind(token.token_type.as_str())
        .bind(token.kind.as_str())
        .bind(token.status.as_str())
        .bind(&token.user_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|err| AuthgateError::database(err, "Failed to insert token"))?;

        Ok(TokenRecord {
            id: token.id,
            token: token.token,
            token_type: token.token_type,
            kind: token.kind,
            status: token.status,
            user_id: token.user_id,
            created_at: now,
            updated_at: now,
        })
    }

    #[instrument(skip(self, token), name = "db_find_token")]
    async fn find_by_token(&self, token: &str) -> Result<Option<TokenRecord>> {
        let row: Option<TokenRow> = sqlx::query_as(
            "SELECT id, token, token_type, kind, status, user_id, created_at, updated_at FROM tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| AuthgateError::database(err, "Failed to fetch token"))?;

        row.map(TokenRecord::try_from).transpose()
    }

    #[instrument(skip(self), fields(user_id = %user_id), name = "db_find_valid_tokens")]
    async fn find_valid_tokens_for_user(&self, user_id: &UserId) -> Result<Vec<TokenRecord>> {
        let rows: Vec<TokenRow> = sqlx::query_as(
            "SELECT id, token, token_type, kind, status, user_id, created_at, updated_at FROM tokens \
             WHERE user_id = $1 AND status = $2 ORDER BY created_at",
        )
        .bind(user_id)
        .bind(TokenStatus::Active.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|err| AuthgateError::database(err, "Failed to fetch valid tokens for user"))?;

        rows.into_iter().map(TokenRecord::try_from).collect()
    }

    #[instrument(skip(self, ids), fields(count = ids.len(), status = %status), name = "db_update_token_status")]
    async fn update_status(&self, ids: &[TokenId], status: TokenStatus) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE tokens SET status = ");
        builder
            .push_bind(status.as_str())
            .push(", updated_at = ")
            .push_bind(Utc::now())
            .push(" WHERE status = ")
            .push_bind(TokenStatus::Active.as_str())
            .push(" AND id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|err| AuthgateError::database(err, "Failed to update token status"))?;

        Ok(result.rows_affected())
    }

    async fn count_by_status(&self, status: TokenStatus) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM tokens WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|err| AuthgateError::database(err, "Failed to count tokens"))
    }
}
