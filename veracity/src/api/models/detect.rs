//! Wire models for the detection endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::scoring::ScoreView;
use crate::types::JobId;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DetectTextRequest {
    /// Text to analyze
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DetectUrlRequest {
    /// URL whose content should be fetched and analyzed
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DetectBatchRequest {
    /// Texts to analyze; results come back in the same order
    pub items: Vec<String>,
}

/// Accepted URL submission: analysis happens asynchronously, poll the job.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UrlSubmissionResponse {
    #[schema(value_type = uuid::Uuid)]
    pub job_id: JobId,
    pub status: String,
    /// The safety-resolved final URL that will be fetched
    pub resolved_url: String,
}

/// One entry in a batch response. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchItemResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ScoreView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DetectBatchResponse {
    pub items: Vec<BatchItemResponse>,
}
