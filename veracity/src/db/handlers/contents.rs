//! Repository for submitted content items.

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::errors::Result;
use crate::db::models::contents::{ContentCreateDBRequest, ContentDBResponse};
use crate::types::{abbrev_uuid, ContentId};

const CONTENT_COLUMNS: &str = "id, user_id, kind, source_url, body, created_at";

pub struct Contents<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Contents<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(kind = %request.kind.as_str()), err)]
    pub async fn create(&mut self, request: &ContentCreateDBRequest) -> Result<ContentDBResponse> {
        let row = sqlx::query_as::<_, ContentDBResponse>(&format!(
            r#"
            INSERT INTO content_items (user_id, kind, source_url, body)
            VALUES ($1, $2, $3, $4)
            RETURNING {CONTENT_COLUMNS}
            "#,
        ))
        .bind(request.user_id)
        .bind(request.kind.as_str())
        .bind(&request.source_url)
        .bind(&request.body)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(row)
    }

    #[instrument(skip(self), fields(content_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: ContentId) -> Result<Option<ContentDBResponse>> {
        let row = sqlx::query_as::<_, ContentDBResponse>(&format!(
            "SELECT {CONTENT_COLUMNS} FROM content_items WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(row)
    }

    /// Store extracted text after a fetch. Used by the worker for URL
    /// submissions whose body arrives asynchronously.
    #[instrument(skip(self, body), fields(content_id = %abbrev_uuid(&id), bytes = body.len()), err)]
    pub async fn set_body(&mut self, id: ContentId, body: &str) -> Result<()> {
        sqlx::query("UPDATE content_items SET body = $2 WHERE id = $1")
            .bind(id)
            .bind(body)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }
}
