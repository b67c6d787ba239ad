//! Hostname blocklist matching and advisory URL suspicion scoring.
//!
//! Blocking combines a static hardcoded rule set with dynamically stored
//! patterns. A pattern matches a hostname by exact equality, by `*.suffix`
//! wildcard, or as a bare dotted suffix (`example.com` blocks
//! `sub.example.com`). A store failure during dynamic-rule lookup fails open:
//! this checkpoint favors availability, and the resolver's network checks
//! still apply.

use once_cell::sync::Lazy;
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashSet;
use std::fmt;
use tracing::warn;
use url::Url;

use crate::db::handlers::BlockedDomains;

/// Hostnames blocked regardless of what the store says.
static STATIC_BLOCKED: &[&str] = &[
    "localhost",
    "metadata.google.internal",
    "169.254.169.254",
    "*.internal",
    "*.local",
];

static SHORTENER_HOSTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["bit.ly", "tinyurl.com", "t.co", "goo.gl", "is.gd", "ow.ly", "buff.ly", "rebrand.ly"]
        .into_iter()
        .collect()
});

static SUSPICIOUS_TLDS: &[&str] = &[".tk", ".ml", ".ga", ".cf", ".gq", ".zip", ".click", ".top"];

const MAX_URL_LENGTH: usize = 2048;
const MAX_QUERY_LENGTH: usize = 1024;
const MAX_PERCENT_ESCAPES: usize = 20;
const MAX_SUBDOMAIN_DEPTH: usize = 5;

/// Does a single blocklist pattern match the hostname? Both sides are expected
/// lowercase; patterns are normalized at write time.
pub fn matches_pattern(pattern: &str, host: &str) -> bool {
    if let Some(suffix) = pattern.strip_prefix("*.") {
        // `*.x` matches x itself and any subdomain of x
        return host == suffix || host.ends_with(&format!(".{suffix}"));
    }
    // Bare patterns match exactly and as a dotted suffix
    host == pattern || host.ends_with(&format!(".{pattern}"))
}

/// Match a hostname against the static set plus the given dynamic patterns.
/// Any single matching rule blocks; order is irrelevant.
pub fn is_host_blocked(host: &str, dynamic_patterns: &[String]) -> bool {
    let host = host.to_lowercase();
    STATIC_BLOCKED.iter().any(|p| matches_pattern(p, &host))
        || dynamic_patterns.iter().any(|p| matches_pattern(p, &host))
}

/// Advisory heuristic signals about a URL. These never block on their own;
/// they are surfaced to callers and logs as context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspicionReason {
    ShortenerHost,
    SuspiciousTld,
    ExcessiveLength,
    ExcessivePercentEncoding,
    OverlongQuery,
    DeepSubdomainNesting,
}

impl fmt::Display for SuspicionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SuspicionReason::ShortenerHost => "known URL shortener host",
            SuspicionReason::SuspiciousTld => "suspicious top-level domain",
            SuspicionReason::ExcessiveLength => "URL length over ceiling",
            SuspicionReason::ExcessivePercentEncoding => "excessive percent-encoding",
            SuspicionReason::OverlongQuery => "overlong query string",
            SuspicionReason::DeepSubdomainNesting => "excessive subdomain depth",
        };
        f.write_str(s)
    }
}

/// Collect all applicable suspicion signals for a URL.
pub fn suspicion_signals(url: &Url) -> Vec<SuspicionReason> {
    let mut reasons = Vec::new();
    let raw = url.as_str();

    if let Some(host) = url.host_str() {
        let host = host.to_lowercase();
        if SHORTENER_HOSTS.contains(host.as_str()) {
            reasons.push(SuspicionReason::ShortenerHost);
        }
        if SUSPICIOUS_TLDS.iter().any(|tld| host.ends_with(tld)) {
            reasons.push(SuspicionReason::SuspiciousTld);
        }
        if host.split('.').count() > MAX_SUBDOMAIN_DEPTH {
            reasons.push(SuspicionReason::DeepSubdomainNesting);
        }
    }

    if raw.len() > MAX_URL_LENGTH {
        reasons.push(SuspicionReason::ExcessiveLength);
    }
    if raw.matches('%').count() > MAX_PERCENT_ESCAPES {
        reasons.push(SuspicionReason::ExcessivePercentEncoding);
    }
    if url.query().is_some_and(|q| q.len() > MAX_QUERY_LENGTH) {
        reasons.push(SuspicionReason::OverlongQuery);
    }

    reasons
}

/// Blocklist checkpoint backed by the shared store.
#[derive(Debug, Clone)]
pub struct BlocklistService {
    db: PgPool,
}

impl BlocklistService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Check a hostname against static and dynamic rules. On store failure the
    /// dynamic set is skipped (fail open) and only static rules apply.
    pub async fn is_blocked(&self, host: &str) -> bool {
        let dynamic = match self.db.acquire().await {
            Ok(mut conn) => match BlockedDomains::new(&mut conn).list_patterns().await {
                Ok(patterns) => patterns,
                Err(e) => {
                    warn!("blocklist lookup failed, failing open: {e:#}");
                    Vec::new()
                }
            },
            Err(e) => {
                warn!("blocklist connection failed, failing open: {e:#}");
                Vec::new()
            }
        };
        is_host_blocked(host, &dynamic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_suffix_and_subdomains() {
        assert!(matches_pattern("*.example.com", "example.com"));
        assert!(matches_pattern("*.example.com", "a.example.com"));
        assert!(matches_pattern("*.example.com", "a.b.example.com"));
        assert!(!matches_pattern("*.example.com", "example.org"));
        assert!(!matches_pattern("*.example.com", "notexample.com"));
    }

    #[test]
    fn bare_pattern_matches_exact_and_dotted_suffix() {
        assert!(matches_pattern("example.com", "example.com"));
        assert!(matches_pattern("example.com", "sub.example.com"));
        assert!(!matches_pattern("example.com", "badexample.com"));
    }

    #[test]
    fn static_rules_always_apply() {
        assert!(is_host_blocked("localhost", &[]));
        assert!(is_host_blocked("169.254.169.254", &[]));
        assert!(is_host_blocked("foo.internal", &[]));
        assert!(!is_host_blocked("example.com", &[]));
    }

    #[test]
    fn dynamic_rules_block_case_insensitively() {
        let rules = vec!["badsite.net".to_string()];
        assert!(is_host_blocked("BadSite.NET", &rules));
        assert!(is_host_blocked("cdn.badsite.net", &rules));
        assert!(!is_host_blocked("goodsite.net", &rules));
    }

    #[test]
    fn shortener_and_tld_signals() {
        let url: Url = "https://bit.ly/abc".parse().unwrap();
        let reasons = suspicion_signals(&url);
        assert!(reasons.contains(&SuspicionReason::ShortenerHost));

        let url: Url = "https://free-prizes.tk/win".parse().unwrap();
        assert!(suspicion_signals(&url).contains(&SuspicionReason::SuspiciousTld));
    }

    #[test]
    fn length_and_query_signals() {
        let long_query = "q=".to_string() + &"x".repeat(1100);
        let url: Url = format!("https://example.com/?{long_query}").parse().unwrap();
        let reasons = suspicion_signals(&url);
        assert!(reasons.contains(&SuspicionReason::OverlongQuery));
        assert!(reasons.contains(&SuspicionReason::ExcessiveLength));
    }

    #[test]
    fn subdomain_depth_signal() {
        let url: Url = "https://a.b.c.d.e.example.com/".parse().unwrap();
        assert!(suspicion_signals(&url).contains(&SuspicionReason::DeepSubdomainNesting));

        let url: Url = "https://www.example.com/".parse().unwrap();
        assert!(!suspicion_signals(&url).contains(&SuspicionReason::DeepSubdomainNesting));
    }

    #[test]
    fn clean_url_has_no_signals() {
        let url: Url = "https://news.example.com/articles/today".parse().unwrap();
        assert!(suspicion_signals(&url).is_empty());
    }
}
