//! # veracity: Ingestion Safety and Access Gating for AI-Detection
//!
//! `veracity` is the service layer that sits between untrusted public input
//! and an AI-generation detection capability. Callers submit text, URLs, or
//! batches; this crate decides what is safe to fetch, what is worth analyzing,
//! who may ask, and how much of the answer they get to see. The detection
//! algorithms themselves live in an external ml-service and are opaque here.
//!
//! ## Request Flow
//!
//! Every `/api/v1/*` request passes the dual authenticator: a bearer API key
//! (prefix-tagged, stored only as a hash) or a dashboard session cookie, with
//! no fallback between the two once a bearer token is present. Authentication
//! resolves the caller's subscription tier and a fresh monthly-quota snapshot;
//! exhausted quotas are refused before any work happens, and every gated
//! response carries `x-quota-*` headers.
//!
//! Text submissions are validated (length bounds, paywall and index-page
//! boilerplate, non-text noise) and scored synchronously. URL submissions are
//! resolved hop by hop with per-hop SSRF and blocklist checks, then queued as
//! a submission job; a budgeted worker fetches, validates, and scores them
//! asynchronously. Responses are shaped per tier: free callers get the
//! composite score and label, paid callers additionally get per-modality
//! signals and whatever explainability the capability reported.
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum); persistence is
//! PostgreSQL via sqlx. The **database layer** ([`db`]) uses the repository
//! pattern over borrowed connections. **Safety** ([`safety`]) holds the
//! blocklist matcher, the redirect resolver, and content validation.
//! **Workers** ([`worker`]) run the live submission pass and the
//! explainability backfill, both wall-clock budgeted. Side effects that must
//! not delay responses (usage recording, key-usage stamps) drain through the
//! [`tasks`] queue.

pub mod api;
pub mod auth;
pub mod config;
mod crypto;
pub mod db;
pub mod detection;
pub mod errors;
mod openapi;
pub mod quota;
pub mod safety;
pub mod scoring;
pub mod tasks;
pub mod telemetry;
pub mod types;
pub mod worker;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use utoipa::OpenApi;

use crate::auth::{DbTierResolver, TierResolver};
pub use crate::config::Config;
use crate::detection::{Detector, HttpDetector};
use crate::quota::QuotaLedger;
use crate::safety::blocklist::BlocklistService;
use crate::safety::network::StandardSafetyPolicy;
use crate::safety::resolver::UrlResolver;
use crate::tasks::TaskQueue;
pub use crate::types::{ApiKeyId, ContentId, JobId, UserId};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub detector: Arc<dyn Detector>,
    pub tier_resolver: Arc<dyn TierResolver>,
    pub quota: QuotaLedger,
    pub tasks: TaskQueue,
    pub resolver: Arc<UrlResolver>,
    /// Client the worker uses to fetch resolved page bodies
    pub fetcher: reqwest::Client,
}

/// Get the veracity database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Main application struct owning the server, state, and background tasks.
///
/// 1. **Create**: [`Application::new`] connects to the database, runs
///    migrations, and wires up the detector, resolver, and side-effect queue
/// 2. **Serve**: [`Application::serve`] binds the listener, starts the
///    scheduled worker pass, and handles requests until the shutdown future
///    completes
/// 3. **Shutdown**: the side-effect queue is drained and the worker schedule
///    cancelled before the process exits
pub struct Application {
    router: Router,
    config: Arc<Config>,
    pool: PgPool,
    state: AppState,
    tasks_handle: JoinHandle<()>,
}

impl Application {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let database_url = config
            .database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("database_url is required (set DATABASE_URL or database_url in config)"))?;

        let pool = PgPool::connect(database_url).await?;
        migrator().run(&pool).await?;

        let config = Arc::new(config);
        let detector: Arc<dyn Detector> = Arc::new(HttpDetector::new(&config.detector)?);
        let tier_resolver: Arc<dyn TierResolver> = Arc::new(DbTierResolver::new(pool.clone()));
        let policy = Arc::new(StandardSafetyPolicy::new(BlocklistService::new(pool.clone())));
        let resolver = Arc::new(UrlResolver::new(policy, &config.safety)?);
        let (tasks, tasks_handle) = TaskQueue::start(pool.clone());

        let fetcher = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let state = AppState {
            db: pool.clone(),
            config: config.clone(),
            detector,
            tier_resolver,
            quota: QuotaLedger::new(pool.clone()),
            tasks,
            resolver,
            fetcher,
        };

        let router = api::router(state.clone());

        Ok(Self {
            router,
            config,
            pool,
            state,
            tasks_handle,
        })
    }

    /// The generated OpenAPI document.
    pub fn openapi() -> utoipa::openapi::OpenApi {
        openapi::ApiDoc::openapi()
    }

    /// Serve until the shutdown future completes, then drain background work.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("veracity listening on http://{bind_addr}");

        let schedule_token = CancellationToken::new();
        let schedule_handle = if self.config.worker.enabled {
            Some(spawn_worker_schedule(self.state.clone(), schedule_token.clone()))
        } else {
            None
        };

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        // Stop the schedule, then drop state so the side-effect channel closes
        // and its drain task can flush the backlog.
        schedule_token.cancel();
        if let Some(handle) = schedule_handle {
            let _ = handle.await;
        }
        drop(self.state);
        if let Err(e) = self.tasks_handle.await {
            warn!("side-effect drain task ended abnormally: {e}");
        }

        info!("Closing database connections...");
        self.pool.close().await;
        Ok(())
    }
}

/// Run the submission pass on a fixed interval until cancelled. Pass failures
/// are logged and the schedule keeps going; a broken pass must not take the
/// server down.
fn spawn_worker_schedule(state: AppState, token: CancellationToken) -> JoinHandle<()> {
    let interval = Duration::from_secs(state.config.worker.interval_secs.max(1));
    let batch_size = state.config.worker.submission_batch_size;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = worker::run_submission_pass(&state, batch_size).await {
                        error!("scheduled submission pass failed: {e:#}");
                    }
                }
            }
        }
        info!("worker schedule stopped");
    })
}
