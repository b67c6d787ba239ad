//! Quota introspection.

use axum::response::IntoResponse;
use axum::Json;
use tracing::instrument;

use crate::auth::AuthContext;
use crate::errors::Result;
use crate::quota::QuotaStatus;

/// Current monthly usage. Informational: works even when the quota is
/// exhausted and consumes nothing.
#[utoipa::path(
    get,
    path = "/api/v1/usage",
    tag = "usage",
    responses((status = 200, description = "Current quota snapshot", body = QuotaStatus))
)]
#[instrument(skip_all, fields(user_id = %crate::types::abbrev_uuid(&auth.user_id)))]
pub async fn usage_status(auth: AuthContext) -> Result<impl IntoResponse> {
    let status = auth.quota.clone();
    Ok((status.headers(), Json(status)))
}
