use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::ContentId;

#[derive(Debug, Clone)]
pub struct ScoreCreateDBRequest {
    pub content_id: ContentId,
    pub score: f64,
    pub classification: String,
    pub confidence: f64,
    pub text_score: Option<f64>,
    pub text_confidence: Option<f64>,
    pub image_score: Option<f64>,
    pub image_confidence: Option<f64>,
    pub video_score: Option<f64>,
    pub video_confidence: Option<f64>,
    pub analyzed_types: Vec<String>,
    pub providers: Option<serde_json::Value>,
    pub heuristics: Option<serde_json::Value>,
    pub fusion: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScoreDBResponse {
    pub id: Uuid,
    pub content_id: ContentId,
    pub score: f64,
    pub classification: String,
    pub confidence: f64,
    pub text_score: Option<f64>,
    pub text_confidence: Option<f64>,
    pub image_score: Option<f64>,
    pub image_confidence: Option<f64>,
    pub video_score: Option<f64>,
    pub video_confidence: Option<f64>,
    pub analyzed_types: Vec<String>,
    pub providers: Option<serde_json::Value>,
    pub heuristics: Option<serde_json::Value>,
    pub fusion: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScoreDBResponse {
    /// A row is missing explainability when the provider breakdown was never
    /// recorded for it.
    pub fn missing_explainability(&self) -> bool {
        self.providers.is_none()
    }
}
