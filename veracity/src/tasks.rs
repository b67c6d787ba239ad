//! Fire-and-forget side effects, applied off the request path.
//!
//! Usage recording and key-usage stamping must never delay or fail a response
//! that has already been decided. Handlers dispatch effects into an unbounded
//! channel; a single background task drains it and logs failures. Dropping the
//! last queue handle closes the channel, so the drain task finishes the
//! backlog and exits during shutdown.

use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::db::handlers::ApiKeys;
use crate::quota::QuotaLedger;
use crate::types::{ApiKeyId, UserId};

#[derive(Debug, Clone)]
pub enum SideEffect {
    /// Append usage events to the monthly ledger.
    RecordUsage {
        user_id: UserId,
        api_key_id: Option<ApiKeyId>,
        endpoint: &'static str,
        count: i64,
    },
    /// Stamp `last_used_at` on a key that just authenticated.
    StampKeyUsage { key_id: ApiKeyId },
}

#[derive(Debug, Clone)]
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<SideEffect>,
}

impl TaskQueue {
    /// Spawn the drain task and return a handle pair. The JoinHandle completes
    /// once every queued effect has been applied after the last sender drops.
    pub fn start(db: PgPool) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<SideEffect>();
        let handle = tokio::spawn(async move {
            let ledger = QuotaLedger::new(db.clone());
            while let Some(effect) = rx.recv().await {
                apply(&db, &ledger, effect).await;
            }
            debug!("side-effect queue drained, worker exiting");
        });
        (Self { tx }, handle)
    }

    /// Enqueue an effect. A send failure means the drain task is gone; the
    /// effect is lost and logged, never surfaced to the caller.
    pub fn dispatch(&self, effect: SideEffect) {
        if self.tx.send(effect).is_err() {
            warn!("side-effect queue is closed, dropping effect");
        }
    }
}

async fn apply(db: &PgPool, ledger: &QuotaLedger, effect: SideEffect) {
    match effect {
        SideEffect::RecordUsage {
            user_id,
            api_key_id,
            endpoint,
            count,
        } => {
            if let Err(e) = ledger.record(user_id, api_key_id, endpoint, count).await {
                warn!("failed to record usage for {endpoint}: {e:#}");
            }
        }
        SideEffect::StampKeyUsage { key_id } => {
            let result = async {
                let mut conn = db.acquire().await.map_err(crate::db::errors::DbError::from)?;
                ApiKeys::new(&mut conn).stamp_last_used(key_id).await
            }
            .await;
            if let Err(e) = result {
                warn!("failed to stamp key usage: {e:#}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::QuotaLedger;
    use crate::types::Tier;

    #[sqlx::test]
    async fn dispatched_usage_lands_in_the_ledger(pool: PgPool) {
        let user_id: UserId = sqlx::query_scalar("INSERT INTO users (email) VALUES ('tasks@example.com') RETURNING id")
            .fetch_one(&pool)
            .await
            .unwrap();

        let (queue, handle) = TaskQueue::start(pool.clone());
        queue.dispatch(SideEffect::RecordUsage {
            user_id,
            api_key_id: None,
            endpoint: "detect",
            count: 2,
        });

        // Dropping the queue closes the channel; the drain task flushes the
        // backlog before exiting.
        drop(queue);
        handle.await.unwrap();

        let status = QuotaLedger::new(pool).status(user_id, Tier::Free).await.unwrap();
        assert_eq!(status.used, 2);
    }
}
