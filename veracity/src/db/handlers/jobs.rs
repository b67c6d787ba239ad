//! Repository for submission jobs.
//!
//! Claims move one row at a time from queued to processing in a single
//! statement with SKIP LOCKED, so concurrent worker passes never process the
//! same job twice.

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::errors::{DbError, Result};
use crate::db::models::jobs::{JobCreateDBRequest, JobDBResponse, JobRow, JobStatus};
use crate::types::{abbrev_uuid, JobId};

const JOB_COLUMNS: &str = "id, content_id, status, error, created_at, updated_at";

pub struct Jobs<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Jobs<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(content_id = %abbrev_uuid(&request.content_id)), err)]
    pub async fn create(&mut self, request: &JobCreateDBRequest) -> Result<JobDBResponse> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            INSERT INTO submission_jobs (content_id)
            VALUES ($1)
            RETURNING {JOB_COLUMNS}
            "#,
        ))
        .bind(request.content_id)
        .fetch_one(&mut *self.db)
        .await?;
        row.try_into().map_err(DbError::Other)
    }

    #[instrument(skip(self), fields(job_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: JobId) -> Result<Option<JobDBResponse>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM submission_jobs WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;
        row.map(JobDBResponse::try_from).transpose().map_err(DbError::Other)
    }

    /// Atomically claim the oldest queued job, if any. The subquery takes a
    /// row lock with SKIP LOCKED so two claimants get different rows.
    #[instrument(skip(self), err)]
    pub async fn claim_next(&mut self) -> Result<Option<JobDBResponse>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            UPDATE submission_jobs
            SET status = 'processing', updated_at = now()
            WHERE id = (
                SELECT id FROM submission_jobs
                WHERE status = 'queued'
                ORDER BY created_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {JOB_COLUMNS}
            "#,
        ))
        .fetch_optional(&mut *self.db)
        .await?;
        row.map(JobDBResponse::try_from).transpose().map_err(DbError::Other)
    }

    #[instrument(skip(self), err)]
    pub async fn count_queued(&mut self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM submission_jobs WHERE status = 'queued'",
        )
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }

    #[instrument(skip(self), fields(job_id = %abbrev_uuid(&id)), err)]
    pub async fn mark_completed(&mut self, id: JobId) -> Result<()> {
        self.set_terminal(id, JobStatus::Completed, None).await
    }

    #[instrument(skip(self), fields(job_id = %abbrev_uuid(&id)), err)]
    pub async fn mark_failed(&mut self, id: JobId, error: &str) -> Result<()> {
        self.set_terminal(id, JobStatus::Failed, Some(error)).await
    }

    async fn set_terminal(&mut self, id: JobId, status: JobStatus, error: Option<&str>) -> Result<()> {
        sqlx::query(
            "UPDATE submission_jobs SET status = $2, error = $3, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(error)
        .execute(&mut *self.db)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Contents, Users};
    use crate::db::models::contents::{ContentCreateDBRequest, ContentKind};
    use crate::db::models::users::UserCreateDBRequest;
    use crate::types::ContentId;
    use sqlx::PgPool;

    async fn seed_content(pool: &PgPool, body: &str) -> ContentId {
        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn)
            .create(&UserCreateDBRequest {
                email: format!("jobs-{}@example.com", uuid::Uuid::new_v4()),
                tier: "free".to_string(),
                is_admin: false,
            })
            .await
            .unwrap();
        Contents::new(&mut conn)
            .create(&ContentCreateDBRequest {
                user_id: user.id,
                kind: ContentKind::Text,
                source_url: None,
                body: Some(body.to_string()),
            })
            .await
            .unwrap()
            .id
    }

    #[sqlx::test]
    async fn claims_oldest_first_and_drains(pool: PgPool) {
        let first = seed_content(&pool, "first").await;
        let second = seed_content(&pool, "second").await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Jobs::new(&mut conn);
        repo.create(&JobCreateDBRequest { content_id: first }).await.unwrap();
        repo.create(&JobCreateDBRequest { content_id: second }).await.unwrap();
        assert_eq!(repo.count_queued().await.unwrap(), 2);

        let claimed = repo.claim_next().await.unwrap().unwrap();
        assert_eq!(claimed.content_id, first);
        assert_eq!(claimed.status, JobStatus::Processing);
        assert_eq!(repo.count_queued().await.unwrap(), 1);

        let claimed = repo.claim_next().await.unwrap().unwrap();
        assert_eq!(claimed.content_id, second);

        assert!(repo.claim_next().await.unwrap().is_none());
        assert_eq!(repo.count_queued().await.unwrap(), 0);
    }

    #[sqlx::test]
    async fn terminal_states_record_errors(pool: PgPool) {
        let content_id = seed_content(&pool, "doomed").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Jobs::new(&mut conn);

        let job = repo.create(&JobCreateDBRequest { content_id }).await.unwrap();
        repo.claim_next().await.unwrap().unwrap();
        repo.mark_failed(job.id, "fetch returned 451").await.unwrap();

        let stored = repo.get_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.error.as_deref(), Some("fetch returned 451"));
        assert!(stored.status.is_terminal());
    }
}
