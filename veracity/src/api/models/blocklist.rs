use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::models::blocked_domains::BlockedDomainDBResponse;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddBlocklistRuleRequest {
    /// Hostname pattern: exact (`bad.example`), wildcard (`*.bad.example`),
    /// or bare suffix (`bad.example` also blocks subdomains)
    pub pattern: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BlocklistRuleResponse {
    pub id: Uuid,
    pub pattern: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<BlockedDomainDBResponse> for BlocklistRuleResponse {
    fn from(rule: BlockedDomainDBResponse) -> Self {
        Self {
            id: rule.id,
            pattern: rule.pattern,
            reason: rule.reason,
            created_at: rule.created_at,
        }
    }
}
