use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::{ContentId, UserId};

/// How a content item entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Url,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Url => "url",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContentCreateDBRequest {
    pub user_id: UserId,
    pub kind: ContentKind,
    pub source_url: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContentDBResponse {
    pub id: ContentId,
    pub user_id: UserId,
    pub kind: String,
    pub source_url: Option<String>,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
}
