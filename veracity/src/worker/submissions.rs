//! Live submission pass: drains queued jobs one claim at a time.
//!
//! URL submissions arrive with no body; the pass fetches the page text,
//! validates it, and runs detection. Text submissions already carry their
//! body and skip the fetch. A failing item marks its job failed and the pass
//! moves on.

use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

use crate::db::errors::DbError;
use crate::db::handlers::{Contents, Jobs, Scores};
use crate::db::models::contents::ContentDBResponse;
use crate::db::models::jobs::JobDBResponse;
use crate::errors::{Error, Result};
use crate::safety::content::validate_content;
use crate::scoring::score_record;
use crate::types::abbrev_uuid;
use crate::worker::WorkerReport;
use crate::AppState;
use crate::detection::DetectionInput;

pub const MIN_BATCH_SIZE: usize = 1;
pub const MAX_BATCH_SIZE: usize = 10;

/// Process up to `batch_size` queued jobs (clamped to [1, 10]) within the
/// configured wall-clock budget.
#[instrument(skip(state), err)]
pub async fn run_submission_pass(state: &AppState, batch_size: usize) -> Result<WorkerReport> {
    let batch_size = batch_size.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE);
    let budget = Duration::from_secs(state.config.worker.budget_secs);
    let started = Instant::now();

    let mut processed = 0usize;
    let mut errors = Vec::new();
    let mut timed_out = false;

    for _ in 0..batch_size {
        if started.elapsed() >= budget {
            timed_out = true;
            break;
        }

        let mut conn = state.db.acquire().await.map_err(DbError::from)?;
        let Some(job) = Jobs::new(&mut conn).claim_next().await? else {
            break;
        };
        drop(conn);

        match process_job(state, &job).await {
            Ok(()) => {
                let mut conn = state.db.acquire().await.map_err(DbError::from)?;
                Jobs::new(&mut conn).mark_completed(job.id).await?;
                processed += 1;
            }
            Err(e) => {
                let description = format!("job {}: {}", abbrev_uuid(&job.id), e.user_message());
                warn!("submission pass item failed: {description}");
                let mut conn = state.db.acquire().await.map_err(DbError::from)?;
                Jobs::new(&mut conn).mark_failed(job.id, &e.user_message()).await?;
                errors.push(description);
            }
        }
    }

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let remaining = Jobs::new(&mut conn).count_queued().await?;

    info!(processed, remaining, failed = errors.len(), timed_out, "submission pass finished");

    Ok(WorkerReport {
        processed,
        remaining,
        errors,
        timed_out,
        timestamp: Utc::now(),
    })
}

async fn process_job(state: &AppState, job: &JobDBResponse) -> Result<()> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let content = Contents::new(&mut conn)
        .get_by_id(job.content_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Content".to_string(),
            id: job.content_id.to_string(),
        })?;
    drop(conn);

    let body = match &content.body {
        Some(body) if !body.is_empty() => body.clone(),
        _ => fetch_body(state, &content).await?,
    };

    let verdict = validate_content(&body, content.source_url.as_deref(), None);
    if !verdict.valid {
        return Err(Error::ContentRejected {
            reasons: verdict.reason_strings(),
        });
    }

    let outcome = state.detector.detect(&DetectionInput::Text(body)).await?;
    let record = score_record(content.id, &outcome);

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    match Scores::new(&mut conn).create(&record).await {
        Ok(_) => Ok(()),
        // A retried job may find its score already written; that is success.
        Err(DbError::UniqueViolation { .. }) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn fetch_body(state: &AppState, content: &ContentDBResponse) -> Result<String> {
    let url = content.source_url.as_deref().ok_or_else(|| Error::BadRequest {
        message: "content item has neither body nor source URL".to_string(),
    })?;

    let response = state
        .fetcher
        .get(url)
        .send()
        .await
        .map_err(|e| Error::BadRequest {
            message: format!("fetch of '{url}' failed: {e}"),
        })?;

    if !response.status().is_success() {
        return Err(Error::BadRequest {
            message: format!("fetch of '{url}' returned {}", response.status()),
        });
    }

    let body = response.text().await.map_err(|e| Error::BadRequest {
        message: format!("could not read body of '{url}': {e}"),
    })?;

    if body.is_empty() {
        return Err(Error::BadRequest {
            message: format!("fetch of '{url}' returned an empty body"),
        });
    }

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    Contents::new(&mut conn).set_body(content.id, &body).await?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::Users;
    use crate::db::models::contents::{ContentCreateDBRequest, ContentKind};
    use crate::db::models::jobs::{JobCreateDBRequest, JobStatus};
    use crate::db::models::users::UserCreateDBRequest;
    use crate::test_utils::test_state;
    use crate::types::{ContentId, UserId};
    use sqlx::PgPool;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn seed_user(pool: &PgPool) -> UserId {
        let mut conn = pool.acquire().await.unwrap();
        Users::new(&mut conn)
            .create(&UserCreateDBRequest {
                email: format!("worker-{}@example.com", uuid::Uuid::new_v4()),
                tier: "free".to_string(),
                is_admin: false,
            })
            .await
            .unwrap()
            .id
    }

    async fn enqueue_text(pool: &PgPool, user_id: UserId, body: &str) -> ContentId {
        let mut conn = pool.acquire().await.unwrap();
        let content = Contents::new(&mut conn)
            .create(&ContentCreateDBRequest {
                user_id,
                kind: ContentKind::Text,
                source_url: None,
                body: Some(body.to_string()),
            })
            .await
            .unwrap();
        Jobs::new(&mut conn)
            .create(&JobCreateDBRequest { content_id: content.id })
            .await
            .unwrap();
        content.id
    }

    fn prose(len: usize) -> String {
        "the quick brown fox jumps over the lazy dog "
            .chars()
            .cycle()
            .take(len)
            .collect()
    }

    #[sqlx::test]
    async fn processes_text_jobs_and_reports(pool: PgPool) {
        let user_id = seed_user(&pool).await;
        let content_id = enqueue_text(&pool, user_id, &prose(400)).await;

        let state = test_state(pool.clone()).await;
        let report = run_submission_pass(&state, 5).await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.remaining, 0);
        assert!(report.errors.is_empty());
        assert!(!report.timed_out);

        let mut conn = pool.acquire().await.unwrap();
        let score = Scores::new(&mut conn).get_by_content(content_id).await.unwrap();
        assert!(score.is_some());
    }

    #[sqlx::test]
    async fn invalid_content_fails_the_job_without_aborting_the_pass(pool: PgPool) {
        let user_id = seed_user(&pool).await;
        enqueue_text(&pool, user_id, "too short").await;
        let good = enqueue_text(&pool, user_id, &prose(400)).await;

        let state = test_state(pool.clone()).await;
        let report = run_submission_pass(&state, 5).await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.errors.len(), 1);

        let mut conn = pool.acquire().await.unwrap();
        assert!(Scores::new(&mut conn).get_by_content(good).await.unwrap().is_some());

        // The failed job carries its rejection reason and is terminal.
        let failed: Vec<String> =
            sqlx::query_scalar("SELECT error FROM submission_jobs WHERE status = 'failed'")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].contains("minimum length"));
    }

    #[sqlx::test]
    async fn url_jobs_fetch_their_body(pool: PgPool) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(ResponseTemplate::new(200).set_body_string(prose(500)))
            .mount(&server)
            .await;

        let user_id = seed_user(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let content = Contents::new(&mut conn)
            .create(&ContentCreateDBRequest {
                user_id,
                kind: ContentKind::Url,
                source_url: Some(format!("{}/article", server.uri())),
                body: None,
            })
            .await
            .unwrap();
        Jobs::new(&mut conn)
            .create(&JobCreateDBRequest { content_id: content.id })
            .await
            .unwrap();
        drop(conn);

        let state = test_state(pool.clone()).await;
        let report = run_submission_pass(&state, 5).await.unwrap();
        assert_eq!(report.processed, 1);

        let mut conn = pool.acquire().await.unwrap();
        let stored = Contents::new(&mut conn).get_by_id(content.id).await.unwrap().unwrap();
        assert!(stored.body.is_some_and(|b| b.len() >= 400));
    }

    #[sqlx::test]
    async fn batch_size_is_clamped(pool: PgPool) {
        let user_id = seed_user(&pool).await;
        for _ in 0..12 {
            enqueue_text(&pool, user_id, &prose(300)).await;
        }

        let state = test_state(pool.clone()).await;
        let report = run_submission_pass(&state, 500).await.unwrap();
        assert_eq!(report.processed, MAX_BATCH_SIZE);
        assert_eq!(report.remaining, 2);
    }

    #[sqlx::test]
    async fn retried_job_tolerates_an_existing_score(pool: PgPool) {
        let user_id = seed_user(&pool).await;
        let content_id = enqueue_text(&pool, user_id, &prose(400)).await;

        let state = test_state(pool.clone()).await;
        run_submission_pass(&state, 5).await.unwrap();

        // Re-queue the same content; the duplicate score insert is tolerated.
        let mut conn = pool.acquire().await.unwrap();
        Jobs::new(&mut conn)
            .create(&JobCreateDBRequest { content_id })
            .await
            .unwrap();
        drop(conn);

        let report = run_submission_pass(&state, 5).await.unwrap();
        assert_eq!(report.processed, 1);
        assert!(report.errors.is_empty());

        let mut conn = pool.acquire().await.unwrap();
        let job_statuses: Vec<String> = sqlx::query_scalar("SELECT status FROM submission_jobs")
            .fetch_all(&mut *conn)
            .await
            .unwrap();
        assert!(job_statuses.iter().all(|s| s == JobStatus::Completed.as_str()));
    }
}
