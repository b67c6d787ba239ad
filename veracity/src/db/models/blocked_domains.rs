use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct BlockedDomainCreateDBRequest {
    pub pattern: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BlockedDomainDBResponse {
    pub id: Uuid,
    pub pattern: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
