//! Explainability backfill pass.
//!
//! Score rows written before explainability capture existed carry NULL
//! provider columns. This pass re-runs detection for those rows and records
//! only the explainability payload. The composite score and classification on
//! the row are never touched, and a row whose explainability has since been
//! filled is skipped by the guarded update, so running the pass twice over the
//! same rows changes nothing.

use chrono::Utc;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

use crate::db::errors::DbError;
use crate::db::handlers::{Contents, Scores};
use crate::db::models::scores::ScoreDBResponse;
use crate::detection::DetectionInput;
use crate::errors::{Error, Result};
use crate::types::abbrev_uuid;
use crate::worker::WorkerReport;
use crate::AppState;

pub const MIN_BATCH_SIZE: usize = 1;
pub const MAX_BATCH_SIZE: usize = 50;

/// Backfill explainability for up to `batch_size` rows (clamped to [1, 50]),
/// newest first, within the configured wall-clock budget.
#[instrument(skip(state), err)]
pub async fn run_backfill_pass(state: &AppState, batch_size: usize) -> Result<WorkerReport> {
    let batch_size = batch_size.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE);
    let budget = Duration::from_secs(state.config.worker.budget_secs);
    let started = Instant::now();

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let total_eligible = Scores::new(&mut conn).count_missing_explainability().await?;
    let rows = Scores::new(&mut conn)
        .list_missing_explainability(batch_size as i64)
        .await?;
    drop(conn);

    let mut processed = 0usize;
    let mut attempted = 0usize;
    let mut errors = Vec::new();
    let mut timed_out = false;

    for row in &rows {
        if started.elapsed() >= budget {
            timed_out = true;
            break;
        }
        attempted += 1;

        match backfill_row(state, row).await {
            Ok(true) => processed += 1,
            // Explainability appeared between the listing and the write;
            // nothing to do.
            Ok(false) => {}
            Err(e) => {
                let description = format!("score {}: {}", abbrev_uuid(&row.id), e.user_message());
                warn!("backfill item failed: {description}");
                errors.push(description);
            }
        }
    }

    // Rows beyond the fetched batch plus any fetched rows the budget cut off.
    let remaining = total_eligible - attempted as i64;

    info!(processed, remaining, failed = errors.len(), timed_out, "backfill pass finished");

    Ok(WorkerReport {
        processed,
        remaining,
        errors,
        timed_out,
        timestamp: Utc::now(),
    })
}

async fn backfill_row(state: &AppState, row: &ScoreDBResponse) -> Result<bool> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let content = Contents::new(&mut conn)
        .get_by_id(row.content_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Content".to_string(),
            id: row.content_id.to_string(),
        })?;
    drop(conn);

    let body = match &content.body {
        Some(body) if !body.is_empty() => body.clone(),
        _ => {
            return Err(Error::BadRequest {
                message: "content has no stored text to derive explainability from".to_string(),
            });
        }
    };

    let outcome = state.detector.detect(&DetectionInput::Text(body)).await?;
    let providers = match &outcome.providers {
        Some(providers) => serde_json::to_value(providers).map_err(|e| Error::Internal {
            operation: format!("serialize provider breakdown: {e}"),
        })?,
        // The capability gave nothing attributable; record an empty breakdown
        // so the row stops looking eligible.
        None => json!([]),
    };

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let written = Scores::new(&mut conn)
        .backfill_explainability(row.id, &providers, outcome.heuristics.as_ref(), outcome.fusion.as_ref())
        .await?;
    Ok(written)
}
