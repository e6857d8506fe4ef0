use std::time::Duration;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

pub type TabId = i64;

/// Freshness window for a cached verdict.
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

pub const LABEL_GOVERNMENT: &str = "Government/Authorized Website";
pub const LABEL_UNSAFE: &str = "Unsafe Website";

/// Verdict for one host at one point in time. `timestamp` is stamped by
/// whoever produced the verdict, never by a cache reader.
/// Verdicts are stamped at millisecond precision, the precision they are
/// persisted with, so a cached verdict reads back equal to the one written.
pub fn verdict_time(now: DateTime<Utc>) -> DateTime<Utc> {
    now.trunc_subsecs(3)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub is_government: bool,
    pub confidence: f64,
    pub is_unsafe: bool,
    pub classification: String,
    pub reason: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl ClassificationResult {
    /// Confidence rendered the way the banner shows it.
    pub fn confidence_percent(&self) -> u8 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub result: ClassificationResult,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(result: ClassificationResult) -> Self {
        let timestamp = result.timestamp;
        Self { result, timestamp }
    }

    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.timestamp
    }

    /// Fresh iff `now - timestamp < ttl`, evaluated on every read.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match TimeDelta::from_std(ttl) {
            Ok(ttl) => self.age(now) < ttl,
            Err(_) => true,
        }
    }
}

/// Which page-lifecycle event (or explicit message) produced a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    TabUpdated,
    NavigationCompleted,
    TabActivated,
    Message,
}

impl Trigger {
    pub fn label(&self) -> &'static str {
        match self {
            Trigger::TabUpdated => "tab_updated",
            Trigger::NavigationCompleted => "navigation_completed",
            Trigger::TabActivated => "tab_activated",
            Trigger::Message => "message",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub address: String,
    pub tab_id: Option<TabId>,
    pub trigger: Trigger,
}

impl CheckRequest {
    pub fn new(address: impl Into<String>, tab_id: Option<TabId>, trigger: Trigger) -> Self {
        Self {
            address: address.into(),
            tab_id,
            trigger,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub sites_checked: u64,
    pub date: String,
}
