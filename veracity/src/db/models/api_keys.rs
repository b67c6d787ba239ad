//! Database DTOs for API keys. The raw key material never appears here; only
//! its hash and a display prefix are stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::{ApiKeyId, UserId};

#[derive(Debug, Clone)]
pub struct ApiKeyCreateDBRequest {
    pub user_id: UserId,
    pub name: String,
    pub key_hash: String,
    pub key_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApiKeyDBResponse {
    pub id: ApiKeyId,
    pub user_id: UserId,
    pub name: String,
    pub key_prefix: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiKeyDBResponse {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

/// Identity attached to a validated, unrevoked key.
#[derive(Debug, Clone, FromRow)]
pub struct ValidatedKeyDBResponse {
    pub key_id: ApiKeyId,
    pub user_id: UserId,
}
