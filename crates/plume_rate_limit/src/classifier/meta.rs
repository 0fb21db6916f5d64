//! Meta Graph API error classification.

use super::{mentions_any, Classification, ErrorClassifier};
use crate::PlatformUsage;
use chrono::{DateTime, Utc};
use plume_error::UpstreamError;
use std::ops::RangeInclusive;
use tracing::debug;

/// Graph API error codes signalling throttling.
///
/// - 4: application request limit reached
/// - 17: user request limit reached
/// - 32: page request limit reached
/// - 613: calls to this API have exceeded the rate limit
pub const META_RATE_LIMIT_CODES: [i64; 4] = [4, 17, 32, 613];

// Business use case throttles (pages, instagram, ads management, ...)
const BUSINESS_USE_CASE_CODES: RangeInclusive<i64> = 80001..=80009;

const RATE_LIMIT_PHRASES: &[&str] = &[
    "request limit reached",
    "rate limit",
    "too many calls",
    "user request limit",
];

/// Classifies Meta Graph API failures.
///
/// A failure is a rate limit when its Graph error code is one of
/// [`META_RATE_LIMIT_CODES`] or a business use case throttle, or when the
/// message uses known throttling phrasing. The reset time comes from the
/// vendor's `estimated_time_to_regain_access` (minutes) in the usage headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetaClassifier;

impl MetaClassifier {
    fn is_rate_limit_code(code: i64) -> bool {
        META_RATE_LIMIT_CODES.contains(&code) || BUSINESS_USE_CASE_CODES.contains(&code)
    }
}

impl ErrorClassifier for MetaClassifier {
    fn classify(&self, error: &UpstreamError, now: DateTime<Utc>) -> Classification {
        let rate_limited = error.code.is_some_and(Self::is_rate_limit_code)
            || mentions_any(&error.message, RATE_LIMIT_PHRASES);

        if !rate_limited {
            return Classification::transient();
        }

        let usage = PlatformUsage::from_meta_lookup(|name| error.header(name), now);
        let reset_at = usage
            .as_ref()
            .and_then(|usage| usage.estimated_minutes_to_regain_access)
            .filter(|minutes| *minutes > 0)
            .and_then(|minutes| i64::try_from(minutes).ok())
            .and_then(chrono::Duration::try_minutes)
            .map(|wait| now + wait);

        debug!(code = ?error.code, ?reset_at, "Classified Meta failure as rate limit");
        Classification::rate_limited(reset_at, usage)
    }
}
