//! Monthly usage accounting.
//!
//! Usage is counted over the current UTC calendar month by counting rows in the
//! append-only `usage_events` ledger. `used` is recomputed from raw events on
//! every check rather than kept in a running counter: a counter cache would
//! need its own month-boundary reset handling, and a single indexed COUNT is
//! cheap at this scale. Crossing a month boundary resets `used` to zero with no
//! explicit reset write.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::instrument;
use utoipa::ToSchema;

use crate::db::errors::DbError;
use crate::errors::Result;
use crate::types::{ApiKeyId, Tier, UserId, abbrev_uuid};

pub const HEADER_QUOTA_LIMIT: &str = "x-quota-limit";
pub const HEADER_QUOTA_REMAINING: &str = "x-quota-remaining";
pub const HEADER_QUOTA_USED: &str = "x-quota-used";
pub const HEADER_QUOTA_RESET: &str = "x-quota-reset";

/// Requests allowed per UTC calendar month for each tier.
pub fn monthly_limit(tier: Tier) -> i64 {
    match tier {
        Tier::Free => 100,
        Tier::Pro => 5_000,
        Tier::Enterprise => 50_000,
    }
}

/// The current UTC month window: (first instant of this month, first instant
/// of next month).
pub fn month_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let (year, month) = (now.year(), now.month());
    let start = Utc
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .expect("first of month is a valid UTC instant");
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let reset = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()
        .expect("first of month is a valid UTC instant");
    (start, reset)
}

/// Snapshot of a user's quota state. Derived, never stored; computed fresh
/// from event counts on each request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuotaStatus {
    pub tier: Tier,
    pub used: i64,
    pub limit: i64,
    pub remaining: i64,
    pub percent_used: f64,
    pub resets_at: DateTime<Utc>,
}

impl QuotaStatus {
    pub fn from_used(tier: Tier, used: i64, now: DateTime<Utc>) -> Self {
        let limit = monthly_limit(tier);
        let remaining = (limit - used).max(0);
        let percent_used = if limit > 0 {
            ((used as f64 / limit as f64) * 1000.0).round() / 10.0
        } else {
            0.0
        };
        let (_, resets_at) = month_window(now);
        Self {
            tier,
            used,
            limit,
            remaining,
            percent_used,
            resets_at,
        }
    }

    pub fn allowed(&self) -> bool {
        self.remaining > 0
    }

    /// Project the state after `count` units are consumed. Response headers use
    /// this so they reflect the request being served, while the actual ledger
    /// write happens off the response path.
    pub fn consume(&self, count: i64) -> Self {
        Self {
            used: self.used + count,
            remaining: (self.remaining - count).max(0),
            ..self.clone()
        }
    }

    /// Quota headers attached to every gated response, success and 429 alike.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(HEADER_QUOTA_LIMIT), HeaderValue::from(self.limit));
        headers.insert(HeaderName::from_static(HEADER_QUOTA_REMAINING), HeaderValue::from(self.remaining));
        headers.insert(HeaderName::from_static(HEADER_QUOTA_USED), HeaderValue::from(self.used));
        headers.insert(
            HeaderName::from_static(HEADER_QUOTA_RESET),
            HeaderValue::try_from(self.resets_at.to_rfc3339()).expect("RFC 3339 timestamp is a valid header value"),
        );
        headers
    }
}

/// Counts and records usage events against the shared store.
#[derive(Debug, Clone)]
pub struct QuotaLedger {
    db: PgPool,
}

impl QuotaLedger {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Compute the fresh quota status for a user.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn status(&self, user_id: UserId, tier: Tier) -> Result<QuotaStatus> {
        let now = Utc::now();
        let (window_start, _) = month_window(now);
        let used: i64 = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM usage_events WHERE user_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(window_start)
        .fetch_one(&self.db)
        .await
        .map_err(DbError::from)?;

        Ok(QuotaStatus::from_used(tier, used, now))
    }

    /// Append `count` usage events. `count > 1` supports batch endpoints where
    /// each batch item consumes one unit. Callers on the response path dispatch
    /// this through the side-effect queue; a recording failure never fails an
    /// already-served request.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), endpoint, count), err)]
    pub async fn record(&self, user_id: UserId, api_key_id: Option<ApiKeyId>, endpoint: &str, count: i64) -> Result<()> {
        if count <= 0 {
            return Ok(());
        }
        sqlx::query(
            "INSERT INTO usage_events (user_id, api_key_id, endpoint)
             SELECT $1, $2, $3 FROM generate_series(1, $4)",
        )
        .bind(user_id)
        .bind(api_key_id)
        .bind(endpoint)
        .bind(count)
        .execute(&self.db)
        .await
        .map_err(DbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_never_goes_negative() {
        let now = Utc::now();
        let status = QuotaStatus::from_used(Tier::Free, 250, now);
        assert_eq!(status.limit, 100);
        assert_eq!(status.remaining, 0);
        assert!(!status.allowed());
    }

    #[test]
    fn remaining_is_limit_minus_used() {
        let now = Utc::now();
        for tier in [Tier::Free, Tier::Pro, Tier::Enterprise] {
            let status = QuotaStatus::from_used(tier, 7, now);
            assert_eq!(status.remaining, monthly_limit(tier) - 7);
            assert!(status.allowed());
        }
    }

    #[test]
    fn month_window_spans_a_calendar_month() {
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 12, 30, 0).unwrap();
        let (start, reset) = month_window(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(reset, Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn month_window_wraps_december() {
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        let (start, reset) = month_window(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(reset, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn quota_headers_carry_full_state() {
        let now = Utc::now();
        let status = QuotaStatus::from_used(Tier::Pro, 42, now);
        let headers = status.headers();
        assert_eq!(headers.get(HEADER_QUOTA_LIMIT).unwrap(), "5000");
        assert_eq!(headers.get(HEADER_QUOTA_USED).unwrap(), "42");
        assert_eq!(headers.get(HEADER_QUOTA_REMAINING).unwrap(), "4958");
        assert!(headers.get(HEADER_QUOTA_RESET).is_some());
    }

    #[sqlx::test]
    async fn status_counts_only_current_month(pool: PgPool) {
        let user_id: UserId = sqlx::query_scalar("INSERT INTO users (email) VALUES ('quota@example.com') RETURNING id")
            .fetch_one(&pool)
            .await
            .unwrap();

        let ledger = QuotaLedger::new(pool.clone());
        ledger.record(user_id, None, "detect", 3).await.unwrap();

        // An event from a previous month must not count toward this window.
        sqlx::query("INSERT INTO usage_events (user_id, endpoint, created_at) VALUES ($1, 'detect', now() - interval '45 days')")
            .bind(user_id)
            .execute(&pool)
            .await
            .unwrap();

        let status = ledger.status(user_id, Tier::Free).await.unwrap();
        assert_eq!(status.used, 3);
        assert_eq!(status.remaining, 97);
    }

    #[sqlx::test]
    async fn record_is_append_only_per_unit(pool: PgPool) {
        let user_id: UserId = sqlx::query_scalar("INSERT INTO users (email) VALUES ('batch@example.com') RETURNING id")
            .fetch_one(&pool)
            .await
            .unwrap();

        let ledger = QuotaLedger::new(pool.clone());
        ledger.record(user_id, None, "detect_batch", 5).await.unwrap();
        ledger.record(user_id, None, "detect", 1).await.unwrap();
        ledger.record(user_id, None, "detect", 0).await.unwrap();

        let status = ledger.status(user_id, Tier::Free).await.unwrap();
        assert_eq!(status.used, 6);
    }
}
