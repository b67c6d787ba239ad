//! Administrative blocklist management.
//!
//! Changes take effect on the next safety check; there is no cache to bust.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::{info, instrument};

use crate::api::models::blocklist::{AddBlocklistRuleRequest, BlocklistRuleResponse};
use crate::auth::AuthContext;
use crate::db::errors::DbError;
use crate::db::handlers::{BlockedDomains, Repository};
use crate::db::models::blocked_domains::BlockedDomainCreateDBRequest;
use crate::errors::{Error, Result};
use crate::AppState;

#[utoipa::path(
    post,
    path = "/admin/api/v1/blocklist",
    tag = "admin",
    request_body = AddBlocklistRuleRequest,
    responses(
        (status = 201, description = "Rule added", body = BlocklistRuleResponse),
        (status = 409, description = "Pattern already present"),
    )
)]
#[instrument(skip(state, auth), fields(pattern = %request.pattern))]
pub async fn add_rule(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<AddBlocklistRuleRequest>,
) -> Result<impl IntoResponse> {
    auth.require_admin()?;

    if BlockedDomains::normalize(&request.pattern).is_empty() {
        return Err(Error::BadRequest {
            message: "pattern must not be empty".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let rule = BlockedDomains::new(&mut conn)
        .create(&BlockedDomainCreateDBRequest {
            pattern: request.pattern,
            reason: request.reason,
        })
        .await?;

    info!(pattern = %rule.pattern, "blocklist rule added");
    Ok((StatusCode::CREATED, Json(BlocklistRuleResponse::from(rule))))
}

#[utoipa::path(
    get,
    path = "/admin/api/v1/blocklist",
    tag = "admin",
    responses((status = 200, description = "All dynamic rules", body = [BlocklistRuleResponse]))
)]
#[instrument(skip_all)]
pub async fn list_rules(State(state): State<AppState>, auth: AuthContext) -> Result<impl IntoResponse> {
    auth.require_admin()?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let rules = BlockedDomains::new(&mut conn).list(&Default::default()).await?;
    let body: Vec<BlocklistRuleResponse> = rules.into_iter().map(BlocklistRuleResponse::from).collect();
    Ok(Json(body))
}

#[utoipa::path(
    delete,
    path = "/admin/api/v1/blocklist/{pattern}",
    tag = "admin",
    params(("pattern" = String, Path, description = "Pattern text to remove")),
    responses(
        (status = 204, description = "Rule removed"),
        (status = 404, description = "No such pattern"),
    )
)]
#[instrument(skip(state, auth))]
pub async fn remove_rule(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(pattern): Path<String>,
) -> Result<impl IntoResponse> {
    auth.require_admin()?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let removed = BlockedDomains::new(&mut conn).delete_by_pattern(&pattern).await?;
    if !removed {
        return Err(Error::NotFound {
            resource: "Blocklist rule".to_string(),
            id: pattern,
        });
    }

    info!(%pattern, "blocklist rule removed");
    Ok(StatusCode::NO_CONTENT)
}
