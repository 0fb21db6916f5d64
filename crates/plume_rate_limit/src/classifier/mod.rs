//! Per-platform classification of upstream failures.
//!
//! A dispatcher hands every failed task's [`UpstreamError`] to its
//! [`ErrorClassifier`]. A rate limit classification puts the dispatcher into
//! cooldown and the task is rejected without retry; anything else is treated
//! as transient and retried with backoff.

mod meta;
mod twitter;

pub use meta::{MetaClassifier, META_RATE_LIMIT_CODES};
pub use twitter::TwitterClassifier;

use crate::PlatformUsage;
use chrono::{DateTime, Utc};
use plume_error::UpstreamError;

/// Outcome of classifying an upstream failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// The platform refused the call because of rate limiting
    pub is_rate_limit: bool,
    /// When the platform says access returns, if it said
    pub reset_at: Option<DateTime<Utc>>,
    /// Usage telemetry carried by the failure
    pub usage: Option<PlatformUsage>,
}

impl Classification {
    /// A failure worth retrying.
    pub fn transient() -> Self {
        Self {
            is_rate_limit: false,
            reset_at: None,
            usage: None,
        }
    }

    /// A rate limit failure.
    pub fn rate_limited(reset_at: Option<DateTime<Utc>>, usage: Option<PlatformUsage>) -> Self {
        Self {
            is_rate_limit: true,
            reset_at,
            usage,
        }
    }
}

/// Decides how a dispatcher reacts to a failed upstream call.
///
/// Implementations must be cheap and side-effect free; they run while the
/// dispatcher's processing pass is active.
pub trait ErrorClassifier: Send + Sync {
    /// Classify `error`, observed at `now`.
    fn classify(&self, error: &UpstreamError, now: DateTime<Utc>) -> Classification;
}

fn mentions_any(message: &str, phrases: &[&str]) -> bool {
    let message = message.to_lowercase();
    phrases.iter().any(|phrase| message.contains(phrase))
}
