//! Repository for user accounts. Accounts are provisioned out of band; this
//! layer only reads identity, tier, and admin standing.

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::errors::Result;
use crate::db::models::users::{UserCreateDBRequest, UserDBResponse};
use crate::types::{abbrev_uuid, UserId};

const USER_COLUMNS: &str = "id, email, tier, is_admin, created_at";

pub struct Users<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(email = %request.email), err)]
    pub async fn create(&mut self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let row = sqlx::query_as::<_, UserDBResponse>(&format!(
            r#"
            INSERT INTO users (email, tier, is_admin)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(&request.email)
        .bind(&request.tier)
        .bind(request.is_admin)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(row)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: UserId) -> Result<Option<UserDBResponse>> {
        let row = sqlx::query_as::<_, UserDBResponse>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(row)
    }
}
