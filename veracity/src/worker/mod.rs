//! Budgeted batch workers.
//!
//! Both passes share the same discipline: a hard wall-clock budget checked
//! before claiming each item (an in-flight item always finishes), per-item
//! error isolation, and a report of what happened so admin callers and the
//! scheduler can see progress.

pub mod backfill;
pub mod submissions;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

pub use backfill::run_backfill_pass;
pub use submissions::run_submission_pass;

/// Outcome of one worker pass.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkerReport {
    /// Items fully processed this pass
    pub processed: usize,
    /// Eligible items left behind, including any fetched but never attempted
    /// before the budget cutoff
    pub remaining: i64,
    /// Per-item failure descriptions; failures never abort the pass
    pub errors: Vec<String>,
    /// Whether the pass stopped on its wall-clock budget
    pub timed_out: bool,
    pub timestamp: DateTime<Utc>,
}
