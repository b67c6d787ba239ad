use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::models::jobs::{JobDBResponse, JobStatus};
use crate::types::{ContentId, JobId};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobStatusResponse {
    #[schema(value_type = uuid::Uuid)]
    pub id: JobId,
    #[schema(value_type = uuid::Uuid)]
    pub content_id: ContentId,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<JobDBResponse> for JobStatusResponse {
    fn from(job: JobDBResponse) -> Self {
        Self {
            id: job.id,
            content_id: job.content_id,
            status: job.status,
            error: job.error,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}
