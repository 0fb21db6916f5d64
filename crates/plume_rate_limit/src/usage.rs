//! Platform usage telemetry parsed from response headers.
//!
//! Meta reports consumption as JSON-encoded headers:
//! - `x-app-usage`: `{"call_count": 28, "total_time": 25, "total_cputime": 25}`
//! - `x-ad-account-usage`: `{"acc_id_util_pct": 9.67, "reset_time_duration": 0}`
//! - `x-business-use-case-usage`: `{"<id>": [{"type": "pages", "call_count": 100,
//!   "total_cputime": 25, "total_time": 25, "estimated_time_to_regain_access": 19}]}`
//!
//! X uses plain integer headers:
//! - `x-rate-limit-limit`, `x-rate-limit-remaining`, `x-rate-limit-reset`
//!
//! Telemetry is surfaced in status snapshots for diagnostics. Admission never
//! depends on it.

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Snapshot of vendor-reported usage counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformUsage {
    /// Percentage of the call budget used (Meta)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_count: Option<f64>,
    /// Percentage of the CPU time budget used (Meta)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cputime: Option<f64>,
    /// Percentage of the wall time budget used (Meta)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<f64>,
    /// Vendor estimate of minutes until access is regained (Meta)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes_to_regain_access: Option<u64>,
    /// Calls allowed in the current window (X)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Calls remaining in the current window (X)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u64>,
    /// When this snapshot was taken
    pub observed_at: DateTime<Utc>,
}

impl PlatformUsage {
    /// Create an empty snapshot observed at `observed_at`.
    pub fn new(observed_at: DateTime<Utc>) -> Self {
        Self {
            call_count: None,
            total_cputime: None,
            total_time: None,
            estimated_minutes_to_regain_access: None,
            limit: None,
            remaining: None,
            observed_at,
        }
    }

    /// Parse Meta usage headers from an HTTP response.
    ///
    /// Returns `None` when no usage header is present.
    pub fn from_meta_headers(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Self> {
        Self::from_meta_lookup(|name| header_str(headers, name), now)
    }

    /// Parse X rate limit headers from an HTTP response.
    ///
    /// Returns `None` when neither limit nor remaining is present.
    pub fn from_twitter_headers(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Self> {
        Self::from_twitter_lookup(|name| header_str(headers, name), now)
    }

    pub(crate) fn from_meta_lookup<'a>(
        get: impl Fn(&str) -> Option<&'a str>,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let mut usage = Self::new(now);
        let mut seen = false;

        if let Some(app) = get("x-app-usage").and_then(parse_json) {
            usage.merge_meta_entry(&app);
            seen = true;
        }

        if let Some(ad) = get("x-ad-account-usage").and_then(parse_json) {
            usage.call_count = max_f64(
                usage.call_count,
                ad.get("acc_id_util_pct").and_then(Value::as_f64),
            );
            let reset_minutes = ad
                .get("reset_time_duration")
                .and_then(Value::as_u64)
                .filter(|secs| *secs > 0)
                .map(|secs| secs.div_ceil(60));
            usage.estimated_minutes_to_regain_access =
                max_u64(usage.estimated_minutes_to_regain_access, reset_minutes);
            seen = true;
        }

        if let Some(business) = get("x-business-use-case-usage").and_then(parse_json) {
            if let Some(accounts) = business.as_object() {
                for entry in accounts
                    .values()
                    .filter_map(Value::as_array)
                    .flatten()
                {
                    usage.merge_meta_entry(entry);
                }
                seen = true;
            }
        }

        seen.then_some(usage)
    }

    pub(crate) fn from_twitter_lookup<'a>(
        get: impl Fn(&str) -> Option<&'a str>,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let limit = get("x-rate-limit-limit").and_then(|v| v.trim().parse().ok());
        let remaining = get("x-rate-limit-remaining").and_then(|v| v.trim().parse().ok());
        if limit.is_none() && remaining.is_none() {
            return None;
        }

        let mut usage = Self::new(now);
        usage.limit = limit;
        usage.remaining = remaining;
        Some(usage)
    }

    // Keeps the worst value seen across app and business-use-case buckets.
    fn merge_meta_entry(&mut self, entry: &Value) {
        self.call_count = max_f64(
            self.call_count,
            entry.get("call_count").and_then(Value::as_f64),
        );
        self.total_cputime = max_f64(
            self.total_cputime,
            entry.get("total_cputime").and_then(Value::as_f64),
        );
        self.total_time = max_f64(
            self.total_time,
            entry.get("total_time").and_then(Value::as_f64),
        );
        self.estimated_minutes_to_regain_access = max_u64(
            self.estimated_minutes_to_regain_access,
            entry
                .get("estimated_time_to_regain_access")
                .and_then(Value::as_u64),
        );
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}

fn parse_json(raw: &str) -> Option<Value> {
    serde_json::from_str(raw).ok()
}

fn max_f64(current: Option<f64>, candidate: Option<f64>) -> Option<f64> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn max_u64(current: Option<u64>, candidate: Option<u64>) -> Option<u64> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}
