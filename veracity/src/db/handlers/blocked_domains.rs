//! Repository for dynamically managed blocklist patterns.
//!
//! Patterns are normalized (trimmed, lowercased) before they hit the table so
//! matching can assume canonical form.

use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

use crate::db::errors::Result;
use crate::db::handlers::repository::Repository;
use crate::db::models::blocked_domains::{BlockedDomainCreateDBRequest, BlockedDomainDBResponse};

#[derive(Debug, Clone, Default)]
pub struct BlockedDomainFilter;

pub struct BlockedDomains<'c> {
    db: &'c mut PgConnection,
}

impl<'c> BlockedDomains<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Canonical form used for storage and matching.
    pub fn normalize(pattern: &str) -> String {
        pattern.trim().to_lowercase()
    }

    /// Every stored pattern, for in-memory matching.
    #[instrument(skip(self), err)]
    pub async fn list_patterns(&mut self) -> Result<Vec<String>> {
        let patterns = sqlx::query_scalar::<_, String>("SELECT pattern FROM blocked_domains")
            .fetch_all(&mut *self.db)
            .await?;
        Ok(patterns)
    }

    /// Remove a rule by its pattern text. Returns false when no such rule
    /// exists.
    #[instrument(skip(self), err)]
    pub async fn delete_by_pattern(&mut self, pattern: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM blocked_domains WHERE pattern = $1")
            .bind(Self::normalize(pattern))
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for BlockedDomains<'c> {
    type CreateRequest = BlockedDomainCreateDBRequest;
    type Response = BlockedDomainDBResponse;
    type Id = Uuid;
    type Filter = BlockedDomainFilter;

    #[instrument(skip(self, request), fields(pattern = %request.pattern), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let row = sqlx::query_as::<_, BlockedDomainDBResponse>(
            r#"
            INSERT INTO blocked_domains (pattern, reason)
            VALUES ($1, $2)
            RETURNING id, pattern, reason, created_at
            "#,
        )
        .bind(Self::normalize(&request.pattern))
        .bind(&request.reason)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(row)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let row = sqlx::query_as::<_, BlockedDomainDBResponse>(
            "SELECT id, pattern, reason, created_at FROM blocked_domains WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(row)
    }

    #[instrument(skip(self, _filter), err)]
    async fn list(&mut self, _filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let rows = sqlx::query_as::<_, BlockedDomainDBResponse>(
            "SELECT id, pattern, reason, created_at FROM blocked_domains ORDER BY created_at DESC",
        )
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM blocked_domains WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::errors::DbError;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn patterns_are_normalized_and_unique(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = BlockedDomains::new(&mut conn);

        let created = repo
            .create(&BlockedDomainCreateDBRequest {
                pattern: "  SPAM-Farm.example  ".to_string(),
                reason: Some("seo spam".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(created.pattern, "spam-farm.example");

        // Duplicate insert (same canonical form) trips the unique constraint.
        let err = repo
            .create(&BlockedDomainCreateDBRequest {
                pattern: "spam-farm.EXAMPLE".to_string(),
                reason: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[sqlx::test]
    async fn delete_by_pattern_reports_absence(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = BlockedDomains::new(&mut conn);

        repo.create(&BlockedDomainCreateDBRequest {
            pattern: "gone.example".to_string(),
            reason: None,
        })
        .await
        .unwrap();

        assert!(repo.delete_by_pattern("gone.example").await.unwrap());
        assert!(!repo.delete_by_pattern("gone.example").await.unwrap());
        assert!(repo.list_patterns().await.unwrap().is_empty());
    }
}
