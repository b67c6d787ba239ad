//! API key lifecycle endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::instrument;

use crate::api::models::api_keys::{ApiKeyResponse, CreateApiKeyRequest, CreatedApiKeyResponse};
use crate::auth::AuthContext;
use crate::db::errors::DbError;
use crate::db::handlers::ApiKeys;
use crate::errors::{Error, Result};
use crate::types::ApiKeyId;
use crate::AppState;

/// Mint a new key. The raw key appears in this response and nowhere else.
#[utoipa::path(
    post,
    path = "/api/v1/keys",
    tag = "keys",
    request_body = CreateApiKeyRequest,
    responses(
        (status = 201, description = "Key created; raw material shown once", body = CreatedApiKeyResponse),
        (status = 400, description = "Invalid key name"),
    )
)]
#[instrument(skip_all, fields(user_id = %crate::types::abbrev_uuid(&auth.user_id)))]
pub async fn create_key(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateApiKeyRequest>,
) -> Result<impl IntoResponse> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(Error::BadRequest {
            message: "key name must not be empty".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let (row, raw_key) = ApiKeys::new(&mut conn).issue(auth.user_id, name).await?;

    let body = CreatedApiKeyResponse {
        id: row.id,
        name: row.name,
        key: raw_key,
        key_prefix: row.key_prefix,
        created_at: row.created_at,
    };
    Ok((StatusCode::CREATED, Json(body)))
}

/// List the caller's keys, revoked ones included. Prefixes only.
#[utoipa::path(
    get,
    path = "/api/v1/keys",
    tag = "keys",
    responses((status = 200, description = "All keys the caller has created", body = [ApiKeyResponse]))
)]
#[instrument(skip_all, fields(user_id = %crate::types::abbrev_uuid(&auth.user_id)))]
pub async fn list_keys(State(state): State<AppState>, auth: AuthContext) -> Result<impl IntoResponse> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let keys = ApiKeys::new(&mut conn).list_for_user(auth.user_id).await?;
    let body: Vec<ApiKeyResponse> = keys.into_iter().map(ApiKeyResponse::from).collect();
    Ok(Json(body))
}

/// Revoke a key. Idempotent; the key row is kept for audit.
#[utoipa::path(
    delete,
    path = "/api/v1/keys/{id}",
    tag = "keys",
    params(("id" = uuid::Uuid, Path, description = "Key identifier")),
    responses(
        (status = 204, description = "Key revoked"),
        (status = 404, description = "No such key for this user"),
    )
)]
#[instrument(skip(state, auth))]
pub async fn revoke_key(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<ApiKeyId>,
) -> Result<impl IntoResponse> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let revoked = ApiKeys::new(&mut conn).revoke(auth.user_id, id).await?;
    if !revoked {
        return Err(Error::NotFound {
            resource: "API key".to_string(),
            id: id.to_string(),
        });
    }
    Ok(StatusCode::NO_CONTENT)
}
