//! Detection endpoints: synchronous text analysis, asynchronous URL
//! submission, and ordered batch analysis.
//!
//! Every response here carries the quota header set, projected past the units
//! this request consumes; the actual ledger write is dispatched off the
//! response path.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::{debug, instrument};
use url::Url;

use crate::api::models::detect::{
    BatchItemResponse, DetectBatchRequest, DetectBatchResponse, DetectTextRequest, DetectUrlRequest, UrlSubmissionResponse,
};
use crate::auth::AuthContext;
use crate::db::errors::DbError;
use crate::db::handlers::{Contents, Jobs, Scores};
use crate::db::models::contents::{ContentCreateDBRequest, ContentKind};
use crate::db::models::jobs::JobCreateDBRequest;
use crate::detection::DetectionInput;
use crate::errors::{Error, Result};
use crate::safety::blocklist::suspicion_signals;
use crate::safety::content::validate_content;
use crate::scoring::{score_record, view_for_tier, ScoreView};
use crate::tasks::SideEffect;
use crate::AppState;

/// Analyze one piece of text synchronously.
#[utoipa::path(
    post,
    path = "/api/v1/detect",
    tag = "detect",
    request_body = DetectTextRequest,
    responses(
        (status = 200, description = "Detection result, shaped for the caller's tier"),
        (status = 422, description = "Content failed quality validation"),
        (status = 429, description = "Monthly quota exhausted"),
    )
)]
#[instrument(skip_all, fields(user_id = %crate::types::abbrev_uuid(&auth.user_id)))]
pub async fn detect_text(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<DetectTextRequest>,
) -> Result<impl IntoResponse> {
    auth.ensure_quota()?;

    let view = analyze_text(&state, &auth, request.text).await?;

    state.tasks.dispatch(SideEffect::RecordUsage {
        user_id: auth.user_id,
        api_key_id: auth.api_key_id,
        endpoint: "detect",
        count: 1,
    });

    Ok((auth.quota.consume(1).headers(), Json(view)))
}

/// Submit a URL for asynchronous analysis. Safety resolution happens inline;
/// fetching and detection happen in the worker. Responds 202 with a job to
/// poll.
#[utoipa::path(
    post,
    path = "/api/v1/detect/url",
    tag = "detect",
    request_body = DetectUrlRequest,
    responses(
        (status = 202, description = "Accepted; analysis is queued", body = UrlSubmissionResponse),
        (status = 400, description = "URL is malformed or unsafe"),
        (status = 429, description = "Monthly quota exhausted"),
    )
)]
#[instrument(skip_all, fields(user_id = %crate::types::abbrev_uuid(&auth.user_id)))]
pub async fn detect_url(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<DetectUrlRequest>,
) -> Result<impl IntoResponse> {
    auth.ensure_quota()?;

    let url: Url = request.url.parse().map_err(|_| Error::BadRequest {
        message: format!("'{}' is not a valid URL", request.url),
    })?;

    let signals = suspicion_signals(&url);
    if !signals.is_empty() {
        debug!(?signals, "suspicious URL accepted for resolution");
    }

    let resolved = state.resolver.resolve(url).await?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let content = Contents::new(&mut conn)
        .create(&ContentCreateDBRequest {
            user_id: auth.user_id,
            kind: ContentKind::Url,
            source_url: Some(resolved.final_url.to_string()),
            body: None,
        })
        .await?;
    let job = Jobs::new(&mut conn)
        .create(&JobCreateDBRequest { content_id: content.id })
        .await?;

    state.tasks.dispatch(SideEffect::RecordUsage {
        user_id: auth.user_id,
        api_key_id: auth.api_key_id,
        endpoint: "detect_url",
        count: 1,
    });

    let body = UrlSubmissionResponse {
        job_id: job.id,
        status: job.status.to_string(),
        resolved_url: resolved.final_url.to_string(),
    };
    Ok((StatusCode::ACCEPTED, auth.quota.consume(1).headers(), Json(body)))
}

/// Analyze a batch of texts. Results come back in submission order; one item's
/// failure never hides its siblings' results. The batch is all-or-nothing
/// against quota: if fewer units remain than items submitted, nothing runs.
#[utoipa::path(
    post,
    path = "/api/v1/detect/batch",
    tag = "detect",
    request_body = DetectBatchRequest,
    responses(
        (status = 200, description = "Per-item results in submission order", body = DetectBatchResponse),
        (status = 400, description = "Batch exceeds the tier's size ceiling"),
        (status = 429, description = "Insufficient quota for the whole batch"),
    )
)]
#[instrument(skip_all, fields(user_id = %crate::types::abbrev_uuid(&auth.user_id), items = request.items.len()))]
pub async fn detect_batch(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<DetectBatchRequest>,
) -> Result<impl IntoResponse> {
    if request.items.is_empty() {
        return Err(Error::BadRequest {
            message: "batch must contain at least one item".to_string(),
        });
    }

    let limit = auth.tier.batch_limit();
    if request.items.len() > limit {
        return Err(Error::BadRequest {
            message: format!("batch size {} exceeds the {} tier limit of {limit}", request.items.len(), auth.tier),
        });
    }

    // Whole-batch admission: a batch larger than the remaining quota is
    // refused outright with zero items processed.
    let count = request.items.len() as i64;
    if count > auth.quota.remaining {
        return Err(Error::QuotaExceeded {
            status: auth.quota.clone(),
        });
    }

    let mut items = Vec::with_capacity(request.items.len());
    for text in request.items {
        match analyze_text(&state, &auth, text).await {
            Ok(view) => items.push(BatchItemResponse {
                result: Some(view),
                error: None,
            }),
            Err(e) => items.push(BatchItemResponse {
                result: None,
                error: Some(e.user_message()),
            }),
        }
    }

    state.tasks.dispatch(SideEffect::RecordUsage {
        user_id: auth.user_id,
        api_key_id: auth.api_key_id,
        endpoint: "detect_batch",
        count,
    });

    Ok((auth.quota.consume(count).headers(), Json(DetectBatchResponse { items })))
}

/// Shared synchronous pipeline: validate, persist, detect, score, shape.
async fn analyze_text(state: &AppState, auth: &AuthContext, text: String) -> Result<ScoreView> {
    let verdict = validate_content(&text, None, None);
    if !verdict.valid {
        return Err(Error::ContentRejected {
            reasons: verdict.reason_strings(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let content = Contents::new(&mut conn)
        .create(&ContentCreateDBRequest {
            user_id: auth.user_id,
            kind: ContentKind::Text,
            source_url: None,
            body: Some(text.clone()),
        })
        .await?;
    drop(conn);

    let outcome = state.detector.detect(&DetectionInput::Text(text)).await?;
    let record = score_record(content.id, &outcome);

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let row = Scores::new(&mut conn).create(&record).await?;

    Ok(view_for_tier(&row, auth.tier))
}
