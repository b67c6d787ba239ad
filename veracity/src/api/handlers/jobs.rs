//! Submission job polling.

use axum::extract::{Path, State};
use axum::http::header::CACHE_CONTROL;
use axum::http::HeaderValue;
use axum::response::IntoResponse;
use axum::Json;
use tracing::instrument;

use crate::api::models::jobs::JobStatusResponse;
use crate::auth::AuthContext;
use crate::db::errors::DbError;
use crate::db::handlers::{Contents, Jobs};
use crate::errors::{Error, Result};
use crate::types::JobId;
use crate::AppState;

/// Poll a submission job. Terminal jobs are cacheable; in-flight jobs are
/// explicitly not. Jobs belonging to other users are indistinguishable from
/// jobs that do not exist.
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}",
    tag = "jobs",
    params(("id" = uuid::Uuid, Path, description = "Job identifier")),
    responses(
        (status = 200, description = "Job state", body = JobStatusResponse),
        (status = 404, description = "No such job"),
    )
)]
#[instrument(skip(state, auth))]
pub async fn job_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<JobId>,
) -> Result<impl IntoResponse> {
    let not_found = || Error::NotFound {
        resource: "Job".to_string(),
        id: id.to_string(),
    };

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let job = Jobs::new(&mut conn).get_by_id(id).await?.ok_or_else(not_found)?;

    let content = Contents::new(&mut conn)
        .get_by_id(job.content_id)
        .await?
        .ok_or_else(not_found)?;
    if content.user_id != auth.user_id && !auth.is_admin {
        return Err(not_found());
    }

    let cache = if job.status.is_terminal() {
        HeaderValue::from_static("public, max-age=60")
    } else {
        HeaderValue::from_static("no-store")
    };

    let body = JobStatusResponse::from(job);
    Ok(([(CACHE_CONTROL, cache)], Json(body)))
}
