use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{
    types::{LABEL_GOVERNMENT, LABEL_UNSAFE},
    verdict_time, ClassificationResult,
};

pub const GOVERNMENT_CONFIDENCE: f64 = 0.7;
pub const OTHER_CONFIDENCE: f64 = 0.3;

static GOVERNMENT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(\.gov(\.[a-z]{2})?$|\.nic\.in$",
        r"|government|ministry|parliament|senate|congress|municipal|embassy)",
    ))
    .expect("valid government pattern")
});

/// Offline classification by host name alone. Never fails: this runs inside
/// the remote client's failure path.
pub fn classify(host: &str, now: DateTime<Utc>) -> ClassificationResult {
    classify_with_keywords(host, &[], now)
}

/// Same as [`classify`], with extra case-insensitive substrings from the
/// user's `customKeywords` setting.
pub fn classify_with_keywords(
    host: &str,
    keywords: &[String],
    now: DateTime<Utc>,
) -> ClassificationResult {
    let timestamp = verdict_time(now);
    match matched_pattern(host, keywords) {
        Some(pattern) => ClassificationResult {
            is_government: true,
            confidence: GOVERNMENT_CONFIDENCE,
            is_unsafe: false,
            classification: LABEL_GOVERNMENT.to_string(),
            reason: format!("Offline check: host matches government pattern '{pattern}'"),
            timestamp,
        },
        None => ClassificationResult {
            is_government: false,
            confidence: OTHER_CONFIDENCE,
            is_unsafe: true,
            classification: LABEL_UNSAFE.to_string(),
            reason: "Offline check: host matches no government pattern".to_string(),
            timestamp,
        },
    }
}

fn matched_pattern(host: &str, keywords: &[String]) -> Option<String> {
    if let Some(found) = GOVERNMENT_PATTERN.find(host) {
        return Some(found.as_str().to_ascii_lowercase());
    }
    let lowered = host.to_lowercase();
    keywords
        .iter()
        .map(|keyword| keyword.trim().to_lowercase())
        .find(|keyword| !keyword.is_empty() && lowered.contains(keyword.as_str()))
}
