use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::UserId;

#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub email: String,
    pub tier: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserDBResponse {
    pub id: UserId,
    pub email: String,
    pub tier: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}
