//! Common type definitions.
//!
//! ID aliases are UUIDs wrapped in type aliases for readability:
//!
//! - [`UserId`]: account identifier
//! - [`ApiKeyId`]: API credential identifier
//! - [`ContentId`]: submitted content identifier
//! - [`JobId`]: queued submission job identifier

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

pub type UserId = Uuid;
pub type ApiKeyId = Uuid;
pub type ContentId = Uuid;
pub type JobId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces.
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// Subscription tier. Determines the monthly quota ceiling and how much score
/// detail a response carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Pro,
    Enterprise,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
            Tier::Enterprise => "enterprise",
        }
    }

    /// Paid tiers see the explainability payload.
    pub fn is_paid(&self) -> bool {
        matches!(self, Tier::Pro | Tier::Enterprise)
    }

    /// Maximum item count for a single batch submission.
    pub fn batch_limit(&self) -> usize {
        match self {
            Tier::Free => 10,
            Tier::Pro => 25,
            Tier::Enterprise => 50,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Tier::Free),
            "pro" => Ok(Tier::Pro),
            "enterprise" => Ok(Tier::Enterprise),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}

/// How a request authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    ApiKey,
    Session,
}
