//! URL ingestion safety: hostname blocklisting, SSRF-safe redirect resolution,
//! and content-quality validation.

pub mod blocklist;
pub mod content;
pub mod network;
pub mod resolver;

pub use blocklist::{BlocklistService, SuspicionReason, is_host_blocked, suspicion_signals};
pub use content::{ContentVerdict, validate_content};
pub use network::{PublicNetworkPolicy, SafetyPolicy, StandardSafetyPolicy};
pub use resolver::{ResolvedUrl, UrlResolver};
