//! Score record assembly and tier-gated response shaping.
//!
//! This module formats what the detection capability reports; it never
//! computes or adjusts scores. `analyzed_types` is derived from which
//! per-modality signals are present, so the stored list always agrees with the
//! populated columns.

use serde::Serialize;
use utoipa::ToSchema;

use crate::db::models::scores::{ScoreCreateDBRequest, ScoreDBResponse};
use crate::detection::DetectionOutcome;
use crate::types::{ContentId, Tier};

/// Build the storable score row from a detection outcome.
pub fn score_record(content_id: ContentId, outcome: &DetectionOutcome) -> ScoreCreateDBRequest {
    let mut analyzed_types = Vec::new();
    if outcome.text.is_some() {
        analyzed_types.push("text".to_string());
    }
    if outcome.image.is_some() {
        analyzed_types.push("image".to_string());
    }
    if outcome.video.is_some() {
        analyzed_types.push("video".to_string());
    }

    let providers = outcome
        .providers
        .as_ref()
        .and_then(|p| serde_json::to_value(p).ok());

    ScoreCreateDBRequest {
        content_id,
        score: outcome.score,
        classification: outcome.classification.clone(),
        confidence: outcome.confidence,
        text_score: outcome.text.map(|s| s.score),
        text_confidence: outcome.text.map(|s| s.confidence),
        image_score: outcome.image.map(|s| s.score),
        image_confidence: outcome.image.map(|s| s.confidence),
        video_score: outcome.video.map(|s| s.score),
        video_confidence: outcome.video.map(|s| s.confidence),
        analyzed_types,
        providers,
        heuristics: outcome.heuristics.clone(),
        fusion: outcome.fusion.clone(),
    }
}

/// Per-modality breakdown included for paid tiers.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ModalityView {
    pub score: f64,
    pub confidence: f64,
}

/// What every tier sees: composite score, label, confidence, and which
/// modalities were analyzed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FreeScoreView {
    #[schema(value_type = uuid::Uuid)]
    pub content_id: ContentId,
    pub score: f64,
    pub classification: String,
    pub confidence: f64,
    pub analyzed_types: Vec<String>,
}

/// The paid view adds per-modality signals and the explainability payload when
/// present. Absent explainability serializes as nulls, never fabricated.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaidScoreView {
    #[serde(flatten)]
    pub base: FreeScoreView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<ModalityView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ModalityView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<ModalityView>,
    pub providers: Option<serde_json::Value>,
    pub heuristics: Option<serde_json::Value>,
    pub fusion: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum ScoreView {
    Paid(Box<PaidScoreView>),
    Free(FreeScoreView),
}

fn free_view(row: &ScoreDBResponse) -> FreeScoreView {
    FreeScoreView {
        content_id: row.content_id,
        score: row.score,
        classification: row.classification.clone(),
        confidence: row.confidence,
        analyzed_types: row.analyzed_types.clone(),
    }
}

fn modality(score: Option<f64>, confidence: Option<f64>) -> Option<ModalityView> {
    match (score, confidence) {
        (Some(score), Some(confidence)) => Some(ModalityView { score, confidence }),
        _ => None,
    }
}

/// Shape a stored score row for the caller's tier. Free tiers get the
/// composite view only; paid tiers additionally see per-modality signals and
/// whatever explainability has been recorded.
pub fn view_for_tier(row: &ScoreDBResponse, tier: Tier) -> ScoreView {
    if !tier.is_paid() {
        return ScoreView::Free(free_view(row));
    }
    ScoreView::Paid(Box::new(PaidScoreView {
        base: free_view(row),
        text: modality(row.text_score, row.text_confidence),
        image: modality(row.image_score, row.image_confidence),
        video: modality(row.video_score, row.video_confidence),
        providers: row.providers.clone(),
        heuristics: row.heuristics.clone(),
        fusion: row.fusion.clone(),
    }))
}
