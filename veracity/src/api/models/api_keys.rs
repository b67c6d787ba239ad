use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::api_keys::ApiKeyDBResponse;
use crate::types::ApiKeyId;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateApiKeyRequest {
    /// Human-readable label for the key
    pub name: String,
}

/// Returned once at creation time; the only moment the raw key is visible.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreatedApiKeyResponse {
    #[schema(value_type = uuid::Uuid)]
    pub id: ApiKeyId,
    pub name: String,
    /// Full key material. Store it now; it cannot be recovered later.
    pub key: String,
    pub key_prefix: String,
    pub created_at: DateTime<Utc>,
}

/// Listing shape: prefix only, never the key itself.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiKeyResponse {
    #[schema(value_type = uuid::Uuid)]
    pub id: ApiKeyId,
    pub name: String,
    pub key_prefix: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl From<ApiKeyDBResponse> for ApiKeyResponse {
    fn from(key: ApiKeyDBResponse) -> Self {
        Self {
            id: key.id,
            name: key.name,
            key_prefix: key.key_prefix,
            created_at: key.created_at,
            last_used_at: key.last_used_at,
            revoked_at: key.revoked_at,
        }
    }
}
