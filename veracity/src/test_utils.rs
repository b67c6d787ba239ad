//! Shared fixtures for unit tests.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::StubTierResolver;
use crate::config::Config;
use crate::detection::{DetectionInput, DetectionOutcome, Detector, ModalitySignal, ProviderDetail};
use crate::errors::Result;
use crate::quota::QuotaLedger;
use crate::safety::network::PublicNetworkPolicy;
use crate::safety::resolver::UrlResolver;
use crate::tasks::TaskQueue;
use crate::types::Tier;
use crate::AppState;
use sqlx::PgPool;

/// Deterministic detector: every input scores 0.75 with a single provider
/// entry, so tests can assert on stored rows without a live ml-service.
pub struct StaticDetector;

#[async_trait]
impl Detector for StaticDetector {
    async fn detect(&self, input: &DetectionInput) -> Result<DetectionOutcome> {
        let signal = ModalitySignal {
            score: 0.75,
            confidence: 0.8,
        };
        let is_text = matches!(input, DetectionInput::Text(_));
        Ok(DetectionOutcome {
            score: 0.75,
            classification: "likely-ai".to_string(),
            confidence: 0.8,
            text: is_text.then_some(signal),
            image: matches!(input, DetectionInput::ImageUrl(_)).then_some(signal),
            video: matches!(input, DetectionInput::VideoUrl(_)).then_some(signal),
            providers: Some(vec![ProviderDetail {
                provider: "static".to_string(),
                score: 0.75,
                confidence: Some(0.8),
                model: Some("fixture".to_string()),
            }]),
            heuristics: Some(json!({"source": "fixture"})),
            fusion: None,
        })
    }
}

/// Full application state over a test pool: static detector, free-tier
/// resolver, and a network policy that tolerates local mock servers.
pub async fn test_state(pool: PgPool) -> AppState {
    let mut config = Config::default();
    config.secret_key = Some("test-secret".to_string());
    let config = Arc::new(config);

    let resolver = Arc::new(
        UrlResolver::new(Arc::new(PublicNetworkPolicy), &config.safety).expect("test resolver builds"),
    );
    let (tasks, _handle) = TaskQueue::start(pool.clone());
    let fetcher = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("test client builds");

    AppState {
        db: pool.clone(),
        config,
        detector: Arc::new(StaticDetector),
        tier_resolver: Arc::new(StubTierResolver(Tier::Free)),
        quota: QuotaLedger::new(pool),
        tasks,
        resolver,
        fetcher,
    }
}
