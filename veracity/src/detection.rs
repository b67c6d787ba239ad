//! The opaque AI-detection capability.
//!
//! This layer never computes scores itself: it hands content to an external
//! ml-service and records whatever composite score, classification, and
//! per-provider detail comes back. The trait seam lets tests substitute a
//! canned detector.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::config::DetectorConfig;
use crate::errors::{Error, Result};

/// What is being analyzed.
#[derive(Debug, Clone)]
pub enum DetectionInput {
    Text(String),
    ImageUrl(Url),
    VideoUrl(Url),
}

impl DetectionInput {
    pub fn modality(&self) -> &'static str {
        match self {
            DetectionInput::Text(_) => "text",
            DetectionInput::ImageUrl(_) => "image",
            DetectionInput::VideoUrl(_) => "video",
        }
    }
}

/// Score and confidence for a single modality.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModalitySignal {
    pub score: f64,
    pub confidence: f64,
}

/// Per-provider detail included in the explainability payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDetail {
    pub provider: String,
    pub score: f64,
    pub confidence: Option<f64>,
    pub model: Option<String>,
}

/// Everything the external capability reports for one piece of content.
/// Composite score and classification arrive already computed; this layer
/// treats them as opaque.
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    /// Composite AI-generation likelihood, 0.0 (human) to 1.0 (AI)
    pub score: f64,
    pub classification: String,
    pub confidence: f64,
    pub text: Option<ModalitySignal>,
    pub image: Option<ModalitySignal>,
    pub video: Option<ModalitySignal>,
    pub providers: Option<Vec<ProviderDetail>>,
    pub heuristics: Option<serde_json::Value>,
    pub fusion: Option<serde_json::Value>,
}

#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self, input: &DetectionInput) -> Result<DetectionOutcome>;
}

/// Wire format of the ml-service detection endpoints.
#[derive(Debug, Deserialize)]
struct RemoteDetectResponse {
    score: f64,
    confidence: f64,
    model: String,
    #[serde(default)]
    classification: Option<String>,
    #[serde(default)]
    providers: Option<Vec<ProviderDetail>>,
    #[serde(default)]
    heuristics: Option<serde_json::Value>,
    #[serde(default)]
    fusion: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct RemoteDetectRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    video_url: Option<&'a str>,
}

/// HTTP client for the detection ml-service.
pub struct HttpDetector {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpDetector {
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal {
                operation: format!("build detector client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: config.url.clone(),
        })
    }

    fn endpoint(&self, input: &DetectionInput) -> Result<Url> {
        let path = match input {
            DetectionInput::Text(_) => "api/detect/text",
            DetectionInput::ImageUrl(_) => "api/detect/image",
            DetectionInput::VideoUrl(_) => "api/detect/video",
        };
        self.base_url.join(path).map_err(|e| Error::Internal {
            operation: format!("build detector endpoint: {e}"),
        })
    }
}

#[async_trait]
impl Detector for HttpDetector {
    async fn detect(&self, input: &DetectionInput) -> Result<DetectionOutcome> {
        let endpoint = self.endpoint(input)?;
        let request = match input {
            DetectionInput::Text(body) => RemoteDetectRequest {
                text: Some(body),
                image_url: None,
                video_url: None,
            },
            DetectionInput::ImageUrl(url) => RemoteDetectRequest {
                text: None,
                image_url: Some(url.as_str()),
                video_url: None,
            },
            DetectionInput::VideoUrl(url) => RemoteDetectRequest {
                text: None,
                image_url: None,
                video_url: Some(url.as_str()),
            },
        };

        let response = self
            .client
            .post(endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Internal {
                operation: format!("call detection service: {e}"),
            })?;

        if !response.status().is_success() {
            return Err(Error::Internal {
                operation: format!("detection service returned {}", response.status()),
            });
        }

        let remote: RemoteDetectResponse = response.json().await.map_err(|e| Error::Internal {
            operation: format!("decode detection response: {e}"),
        })?;

        let signal = ModalitySignal {
            score: remote.score,
            confidence: remote.confidence,
        };
        let classification = remote.classification.unwrap_or_else(|| classify(remote.score));
        let providers = remote.providers.or_else(|| {
            Some(vec![ProviderDetail {
                provider: "ml-service".to_string(),
                score: remote.score,
                confidence: Some(remote.confidence),
                model: Some(remote.model.clone()),
            }])
        });

        Ok(DetectionOutcome {
            score: remote.score,
            classification,
            confidence: remote.confidence,
            text: matches!(input, DetectionInput::Text(_)).then_some(signal),
            image: matches!(input, DetectionInput::ImageUrl(_)).then_some(signal),
            video: matches!(input, DetectionInput::VideoUrl(_)).then_some(signal),
            providers,
            heuristics: remote.heuristics,
            fusion: remote.fusion,
        })
    }
}

/// Fallback label mapping for ml-service builds that do not report one.
/// Thresholds belong to the capability, not the gating layer.
fn classify(score: f64) -> String {
    let label = match score {
        s if s >= 0.8 => "ai-generated",
        s if s >= 0.6 => "likely-ai",
        s if s >= 0.4 => "uncertain",
        s if s >= 0.2 => "likely-human",
        _ => "human",
    };
    label.to_string()
}
