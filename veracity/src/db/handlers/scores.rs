//! Repository for AI score records.
//!
//! Score rows are written once per content item. The explainability columns
//! (providers, heuristics, fusion) may start NULL and be filled in later by
//! the backfill pass; the composite score and classification are never
//! rewritten by that pass.

use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

use crate::db::errors::Result;
use crate::db::models::scores::{ScoreCreateDBRequest, ScoreDBResponse};
use crate::types::{abbrev_uuid, ContentId};

const SCORE_COLUMNS: &str = "id, content_id, score, classification, confidence, \
    text_score, text_confidence, image_score, image_confidence, video_score, video_confidence, \
    analyzed_types, providers, heuristics, fusion, created_at, updated_at";

pub struct Scores<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Scores<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(content_id = %abbrev_uuid(&request.content_id)), err)]
    pub async fn create(&mut self, request: &ScoreCreateDBRequest) -> Result<ScoreDBResponse> {
        let row = sqlx::query_as::<_, ScoreDBResponse>(&format!(
            r#"
            INSERT INTO ai_scores (
                content_id, score, classification, confidence,
                text_score, text_confidence, image_score, image_confidence,
                video_score, video_confidence, analyzed_types,
                providers, heuristics, fusion
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {SCORE_COLUMNS}
            "#,
        ))
        .bind(request.content_id)
        .bind(request.score)
        .bind(&request.classification)
        .bind(request.confidence)
        .bind(request.text_score)
        .bind(request.text_confidence)
        .bind(request.image_score)
        .bind(request.image_confidence)
        .bind(request.video_score)
        .bind(request.video_confidence)
        .bind(&request.analyzed_types)
        .bind(&request.providers)
        .bind(&request.heuristics)
        .bind(&request.fusion)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(row)
    }

    #[instrument(skip(self), fields(content_id = %abbrev_uuid(&content_id)), err)]
    pub async fn get_by_content(&mut self, content_id: ContentId) -> Result<Option<ScoreDBResponse>> {
        let row = sqlx::query_as::<_, ScoreDBResponse>(&format!(
            "SELECT {SCORE_COLUMNS} FROM ai_scores WHERE content_id = $1",
        ))
        .bind(content_id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(row)
    }

    /// Rows still awaiting their explainability payload, newest first so
    /// recent submissions benefit before historical ones.
    #[instrument(skip(self), err)]
    pub async fn list_missing_explainability(&mut self, limit: i64) -> Result<Vec<ScoreDBResponse>> {
        let rows = sqlx::query_as::<_, ScoreDBResponse>(&format!(
            r#"
            SELECT {SCORE_COLUMNS} FROM ai_scores
            WHERE providers IS NULL
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        ))
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }

    #[instrument(skip(self), err)]
    pub async fn count_missing_explainability(&mut self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ai_scores WHERE providers IS NULL")
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count)
    }

    /// Fill in explainability for one row. The guard on `providers IS NULL`
    /// makes the write idempotent: a row that already carries explainability
    /// is left untouched and the call reports false.
    #[instrument(skip(self, providers, heuristics, fusion), fields(score_id = %abbrev_uuid(&id)), err)]
    pub async fn backfill_explainability(
        &mut self,
        id: Uuid,
        providers: &serde_json::Value,
        heuristics: Option<&serde_json::Value>,
        fusion: Option<&serde_json::Value>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE ai_scores
            SET providers = $2, heuristics = $3, fusion = $4, updated_at = now()
            WHERE id = $1 AND providers IS NULL
            "#,
        )
        .bind(id)
        .bind(providers)
        .bind(heuristics)
        .bind(fusion)
        .execute(&mut *self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Contents, Users};
    use crate::db::models::contents::{ContentCreateDBRequest, ContentKind};
    use crate::db::models::users::UserCreateDBRequest;
    use serde_json::json;
    use sqlx::PgPool;

    async fn seed_content(pool: &PgPool) -> ContentId {
        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn)
            .create(&UserCreateDBRequest {
                email: "scores@example.com".to_string(),
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
                body: Some("body".to_string()),
            })
            .await
            .unwrap()
            .id
    }

    fn bare_score(content_id: ContentId) -> ScoreCreateDBRequest {
        ScoreCreateDBRequest {
            content_id,
            score: 0.42,
            classification: "uncertain".to_string(),
            confidence: 0.6,
            text_score: Some(0.42),
            text_confidence: Some(0.6),
            image_score: None,
            image_confidence: None,
            video_score: None,
            video_confidence: None,
            analyzed_types: vec!["text".to_string()],
            providers: None,
            heuristics: None,
            fusion: None,
        }
    }

    #[sqlx::test]
    async fn backfill_writes_once_and_preserves_score(pool: PgPool) {
        let content_id = seed_content(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Scores::new(&mut conn);

        let row = repo.create(&bare_score(content_id)).await.unwrap();
        assert!(row.missing_explainability());
        assert_eq!(repo.count_missing_explainability().await.unwrap(), 1);

        let providers = json!([{ "provider": "ml-service", "score": 0.42 }]);
        let written = repo
            .backfill_explainability(row.id, &providers, None, Some(&json!({"method": "weighted"})))
            .await
            .unwrap();
        assert!(written);

        // Second pass over the same row is a no-op.
        let again = repo
            .backfill_explainability(row.id, &json!([{"provider": "other"}]), None, None)
            .await
            .unwrap();
        assert!(!again);

        let stored = repo.get_by_content(content_id).await.unwrap().unwrap();
        assert_eq!(stored.providers, Some(providers));
        assert_eq!(stored.score, 0.42);
        assert_eq!(stored.classification, "uncertain");
        assert_eq!(repo.count_missing_explainability().await.unwrap(), 0);
    }

    #[sqlx::test]
    async fn missing_explainability_lists_newest_first(pool: PgPool) {
        let first = seed_content(&pool).await;
        let mut conn = pool.acquire().await.unwrap();

        let user_id = Contents::new(&mut conn).get_by_id(first).await.unwrap().unwrap().user_id;
        let second = Contents::new(&mut conn)
            .create(&ContentCreateDBRequest {
                user_id,
                kind: ContentKind::Text,
                source_url: None,
                body: Some("later".to_string()),
            })
            .await
            .unwrap()
            .id;

        let mut repo = Scores::new(&mut conn);
        repo.create(&bare_score(first)).await.unwrap();
        repo.create(&bare_score(second)).await.unwrap();

        let missing = repo.list_missing_explainability(10).await.unwrap();
        assert_eq!(missing.len(), 2);
        assert!(missing[0].created_at >= missing[1].created_at);
    }
}
