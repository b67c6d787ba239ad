//! Repository for API keys.
//!
//! Only the SHA-256 hash of the key material is stored; lookup by raw key is
//! a hash comparison. Revocation stamps a timestamp and is idempotent, so a
//! revoked key keeps its audit trail and can never be re-issued.

use sqlx::PgConnection;
use tracing::instrument;

use crate::crypto::{display_prefix, generate_api_key, hash_api_key};
use crate::db::errors::Result;
use crate::db::models::api_keys::{ApiKeyCreateDBRequest, ApiKeyDBResponse, ValidatedKeyDBResponse};
use crate::types::{abbrev_uuid, ApiKeyId, UserId};

const API_KEY_COLUMNS: &str = "id, user_id, name, key_prefix, created_at, last_used_at, revoked_at";

pub struct ApiKeys<'c> {
    db: &'c mut PgConnection,
}

impl<'c> ApiKeys<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Mint a new key for a user. The raw key is returned exactly once,
    /// alongside the stored row; it cannot be recovered afterwards.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn issue(&mut self, user_id: UserId, name: &str) -> Result<(ApiKeyDBResponse, String)> {
        let raw_key = generate_api_key();
        let request = ApiKeyCreateDBRequest {
            user_id,
            name: name.to_string(),
            key_hash: hash_api_key(&raw_key),
            key_prefix: display_prefix(&raw_key),
        };

        let row = sqlx::query_as::<_, ApiKeyDBResponse>(&format!(
            r#"
            INSERT INTO api_keys (user_id, name, key_hash, key_prefix)
            VALUES ($1, $2, $3, $4)
            RETURNING {API_KEY_COLUMNS}
            "#,
        ))
        .bind(request.user_id)
        .bind(&request.name)
        .bind(&request.key_hash)
        .bind(&request.key_prefix)
        .fetch_one(&mut *self.db)
        .await?;

        Ok((row, raw_key))
    }

    /// Resolve raw key material to an identity. Returns None for unknown or
    /// revoked keys; the two cases are indistinguishable to callers.
    #[instrument(skip_all, err)]
    pub async fn validate(&mut self, raw_key: &str) -> Result<Option<ValidatedKeyDBResponse>> {
        let hash = hash_api_key(raw_key);
        let row = sqlx::query_as::<_, ValidatedKeyDBResponse>(
            r#"
            SELECT id AS key_id, user_id
            FROM api_keys
            WHERE key_hash = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(hash)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(row)
    }

    /// Revoke a key owned by the given user. Converges under concurrent
    /// revocations: the first timestamp wins and later calls are no-ops.
    /// Returns false when the key does not exist or belongs to someone else.
    #[instrument(skip(self), fields(key_id = %abbrev_uuid(&key_id)), err)]
    pub async fn revoke(&mut self, user_id: UserId, key_id: ApiKeyId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE api_keys
            SET revoked_at = COALESCE(revoked_at, now())
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(key_id)
        .bind(user_id)
        .execute(&mut *self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All keys a user has ever created, including revoked ones.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn list_for_user(&mut self, user_id: UserId) -> Result<Vec<ApiKeyDBResponse>> {
        let rows = sqlx::query_as::<_, ApiKeyDBResponse>(&format!(
            "SELECT {API_KEY_COLUMNS} FROM api_keys WHERE user_id = $1 ORDER BY created_at DESC",
        ))
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }

    /// Best-effort usage stamp, applied off the request path.
    #[instrument(skip(self), fields(key_id = %abbrev_uuid(&key_id)), err)]
    pub async fn stamp_last_used(&mut self, key_id: ApiKeyId) -> Result<()> {
        sqlx::query("UPDATE api_keys SET last_used_at = now() WHERE id = $1")
            .bind(key_id)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }
}
