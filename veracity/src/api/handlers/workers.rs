//! Administrative worker triggers.
//!
//! Both passes also run on the internal schedule; these endpoints exist for
//! operational pokes and observability of a single pass.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use tracing::instrument;

use crate::api::models::workers::RunWorkerRequest;
use crate::auth::AuthContext;
use crate::errors::Result;
use crate::worker::{run_backfill_pass, run_submission_pass, WorkerReport};
use crate::AppState;

#[utoipa::path(
    post,
    path = "/admin/api/v1/workers/submissions",
    tag = "admin",
    request_body = RunWorkerRequest,
    responses((status = 200, description = "Pass report", body = WorkerReport))
)]
#[instrument(skip(state, auth))]
pub async fn run_submissions(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<RunWorkerRequest>,
) -> Result<impl IntoResponse> {
    auth.require_admin()?;
    let batch_size = request.batch_size.unwrap_or(state.config.worker.submission_batch_size);
    let report = run_submission_pass(&state, batch_size).await?;
    Ok(Json(report))
}

#[utoipa::path(
    post,
    path = "/admin/api/v1/workers/backfill",
    tag = "admin",
    request_body = RunWorkerRequest,
    responses((status = 200, description = "Pass report", body = WorkerReport))
)]
#[instrument(skip(state, auth))]
pub async fn run_backfill(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<RunWorkerRequest>,
) -> Result<impl IntoResponse> {
    auth.require_admin()?;
    let batch_size = request.batch_size.unwrap_or(state.config.worker.backfill_batch_size);
    let report = run_backfill_pass(&state, batch_size).await?;
    Ok(Json(report))
}
