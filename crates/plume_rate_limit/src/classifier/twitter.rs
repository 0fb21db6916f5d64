//! X (Twitter) API error classification.

use super::{mentions_any, Classification, ErrorClassifier};
use crate::PlatformUsage;
use chrono::{DateTime, Utc};
use plume_error::UpstreamError;
use tracing::debug;

const RESET_HEADER: &str = "x-rate-limit-reset";

// v1.1 "Rate limit exceeded"
const RATE_LIMIT_CODE: i64 = 88;

const RATE_LIMIT_PHRASES: &[&str] = &["rate limit", "too many requests"];

/// Classifies X API failures.
///
/// A failure is a rate limit when the response status is 429, the legacy
/// error code is 88, or the message mentions rate limiting. The reset time is
/// taken from the `x-rate-limit-reset` header (epoch seconds) when present.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwitterClassifier;

impl ErrorClassifier for TwitterClassifier {
    fn classify(&self, error: &UpstreamError, now: DateTime<Utc>) -> Classification {
        let rate_limited = error.status == Some(429)
            || error.code == Some(RATE_LIMIT_CODE)
            || mentions_any(&error.message, RATE_LIMIT_PHRASES);

        if !rate_limited {
            return Classification::transient();
        }

        let reset_at = error
            .header(RESET_HEADER)
            .and_then(|value| value.trim().parse::<i64>().ok())
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
        let usage = PlatformUsage::from_twitter_lookup(|name| error.header(name), now);

        debug!(?reset_at, status = ?error.status, "Classified X failure as rate limit");
        Classification::rate_limited(reset_at, usage)
    }
}
