//! Content-quality validation for extracted text.
//!
//! Checks run independently and every applicable rejection reason is
//! accumulated; validity means zero reasons, not "first reason wins". This
//! lets callers log or surface all causes at once.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Serialize;
use std::fmt;
use tracing::debug;

pub const MIN_CONTENT_LENGTH: usize = 200;
pub const MAX_CONTENT_LENGTH: usize = 500_000;

static GATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(sign in to continue|log ?in to continue|subscribe to (read|continue)|subscribers? only|this content is for members|paywall|accept (all )?cookies|cookie consent|we use cookies|create a free account|please enable javascript)",
    )
    .expect("gate pattern is valid")
});

static INDEX_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(index of /|sitemap|site map|directory listing|archives? for |table of contents|browse (all|by))")
        .expect("index pattern is valid")
});

/// Why a piece of text was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    TooShort,
    TooLong,
    GatedContent,
    GeneratedIndexPage,
    NonTextContent,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectionReason::TooShort => "text is below the minimum length",
            RejectionReason::TooLong => "text exceeds the maximum length",
            RejectionReason::GatedContent => "text appears to be login, paywall, or consent boilerplate",
            RejectionReason::GeneratedIndexPage => "text appears to be an auto-generated index or listing page",
            RejectionReason::NonTextContent => "text contains no readable content",
        };
        f.write_str(s)
    }
}

/// Validation verdict: a boolean plus the full accumulated reason list.
#[derive(Debug, Clone)]
pub struct ContentVerdict {
    pub valid: bool,
    pub reasons: Vec<RejectionReason>,
}

impl ContentVerdict {
    pub fn reason_strings(&self) -> Vec<String> {
        self.reasons.iter().map(|r| r.to_string()).collect()
    }
}

/// Run every quality check against extracted text. `url` and `domain` are
/// carried for logging context only.
pub fn validate_content(text: &str, url: Option<&str>, domain: Option<&str>) -> ContentVerdict {
    let mut reasons = Vec::new();

    let length = text.chars().count();
    if length < MIN_CONTENT_LENGTH {
        reasons.push(RejectionReason::TooShort);
    } else if length > MAX_CONTENT_LENGTH {
        reasons.push(RejectionReason::TooLong);
    }

    if GATE_PATTERN.is_match(text) {
        reasons.push(RejectionReason::GatedContent);
    }

    if let Some(first_line) = text.lines().next()
        && INDEX_PATTERN.is_match(first_line)
    {
        reasons.push(RejectionReason::GeneratedIndexPage);
    }

    if !text.chars().any(|c| c.is_alphabetic()) {
        reasons.push(RejectionReason::NonTextContent);
    }

    if !reasons.is_empty() {
        debug!(?url, ?domain, ?reasons, "content rejected");
    }

    ContentVerdict {
        valid: reasons.is_empty(),
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prose(len: usize) -> String {
        "the quick brown fox jumps over the lazy dog "
            .chars()
            .cycle()
            .take(len)
            .collect()
    }

    #[test]
    fn boundary_lengths() {
        let verdict = validate_content(&prose(199), None, None);
        assert!(!verdict.valid);
        assert_eq!(verdict.reasons, vec![RejectionReason::TooShort]);

        let verdict = validate_content(&prose(200), None, None);
        assert!(verdict.valid, "exactly 200 chars with no other trigger is valid");
    }

    #[test]
    fn oversized_text_is_rejected() {
        let verdict = validate_content(&prose(MAX_CONTENT_LENGTH + 1), None, None);
        assert!(!verdict.valid);
        assert!(verdict.reasons.contains(&RejectionReason::TooLong));
    }

    #[test]
    fn paywall_language_is_rejected() {
        let text = format!("{} Subscribe to continue reading this story.", prose(250));
        let verdict = validate_content(&text, Some("https://news.example.com/a"), Some("news.example.com"));
        assert!(!verdict.valid);
        assert_eq!(verdict.reasons, vec![RejectionReason::GatedContent]);
    }

    #[test]
    fn index_page_first_line_is_rejected() {
        let text = format!("Index of /uploads\n{}", prose(300));
        let verdict = validate_content(&text, None, None);
        assert!(!verdict.valid);
        assert!(verdict.reasons.contains(&RejectionReason::GeneratedIndexPage));
    }

    #[test]
    fn index_language_beyond_first_line_is_fine() {
        let text = format!("{}\nIndex of /uploads", prose(300));
        let verdict = validate_content(&text, None, None);
        assert!(verdict.valid);
    }

    #[test]
    fn punctuation_noise_is_rejected() {
        let noise: String = ".,;:!?-- 0123456789 ".chars().cycle().take(300).collect();
        let verdict = validate_content(&noise, None, None);
        assert!(!verdict.valid);
        assert!(verdict.reasons.contains(&RejectionReason::NonTextContent));
    }

    #[test]
    fn reasons_accumulate() {
        // Short AND non-text: both reasons reported together.
        let verdict = validate_content("...!!!???", None, None);
        assert!(!verdict.valid);
        assert!(verdict.reasons.contains(&RejectionReason::TooShort));
        assert!(verdict.reasons.contains(&RejectionReason::NonTextContent));
        assert_eq!(verdict.reasons.len(), 2);
    }
}
