//! OpenAPI document assembled from handler annotations.

use utoipa::OpenApi;

use crate::api::handlers;
use crate::api::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Veracity API",
        description = "Ingestion-safety and access-gating layer for AI-generation detection"
    ),
    paths(
        handlers::health::health,
        handlers::detect::detect_text,
        handlers::detect::detect_url,
        handlers::detect::detect_batch,
        handlers::jobs::job_status,
        handlers::usage::usage_status,
        handlers::api_keys::create_key,
        handlers::api_keys::list_keys,
        handlers::api_keys::revoke_key,
        handlers::blocklist::add_rule,
        handlers::blocklist::list_rules,
        handlers::blocklist::remove_rule,
        handlers::workers::run_submissions,
        handlers::workers::run_backfill,
    ),
    components(schemas(
        models::detect::DetectTextRequest,
        models::detect::DetectUrlRequest,
        models::detect::DetectBatchRequest,
        models::detect::UrlSubmissionResponse,
        models::detect::BatchItemResponse,
        models::detect::DetectBatchResponse,
        models::jobs::JobStatusResponse,
        models::api_keys::CreateApiKeyRequest,
        models::api_keys::CreatedApiKeyResponse,
        models::api_keys::ApiKeyResponse,
        models::blocklist::AddBlocklistRuleRequest,
        models::blocklist::BlocklistRuleResponse,
        models::workers::RunWorkerRequest,
        crate::db::models::jobs::JobStatus,
        crate::quota::QuotaStatus,
        crate::scoring::ScoreView,
        crate::scoring::FreeScoreView,
        crate::scoring::PaidScoreView,
        crate::scoring::ModalityView,
        crate::worker::WorkerReport,
    )),
    tags(
        (name = "detect", description = "Content detection endpoints"),
        (name = "jobs", description = "Asynchronous submission jobs"),
        (name = "keys", description = "API key management"),
        (name = "usage", description = "Quota introspection"),
        (name = "admin", description = "Administrative operations"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;
