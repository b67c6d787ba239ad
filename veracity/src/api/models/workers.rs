use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RunWorkerRequest {
    /// Override the configured batch size for this pass. Clamped to the
    /// pass-specific ceiling.
    pub batch_size: Option<usize>,
}
