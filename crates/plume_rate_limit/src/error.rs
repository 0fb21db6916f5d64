//! Error types for dispatch operations.

use crate::PlatformUsage;
use chrono::{DateTime, Utc};
use plume_error::UpstreamError;
use serde::Serialize;
use std::fmt;

/// Details of an active platform cooldown.
///
/// Returned both when an upstream call is classified as rate limited and when
/// a submission is rejected because a cooldown is already in effect. Callers
/// use `reset_at`/`seconds_remaining` to tell their own clients when to retry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitExceeded {
    /// Platform that is rate limited
    pub platform: String,
    /// Time at which the platform is expected to accept calls again
    pub reset_at: DateTime<Utc>,
    /// Whole seconds until `reset_at` (rounded up)
    pub seconds_remaining: u64,
    /// Last usage telemetry reported by the platform
    pub last_known_usage: Option<PlatformUsage>,
}

impl RateLimitExceeded {
    /// Describe a cooldown ending at `reset_at`, as seen at `now`.
    pub fn new(
        platform: impl Into<String>,
        reset_at: DateTime<Utc>,
        now: DateTime<Utc>,
        last_known_usage: Option<PlatformUsage>,
    ) -> Self {
        let millis = (reset_at - now).num_milliseconds().max(0) as u64;
        Self {
            platform: platform.into(),
            reset_at,
            seconds_remaining: millis.div_ceil(1000),
            last_known_usage,
        }
    }
}

impl fmt::Display for RateLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rate limited until {} ({}s remaining)",
            self.platform,
            self.reset_at.format("%H:%M:%S UTC"),
            self.seconds_remaining
        )
    }
}

/// Error kinds for dispatch operations.
#[derive(Debug, Clone, derive_more::From)]
pub enum RateLimitErrorKind {
    /// Platform is in cooldown; the task was not (or no longer) attempted.
    #[from]
    LimitExceeded(RateLimitExceeded),
    /// Task failed with a non rate-limit error after exhausting its retries.
    #[from]
    Upstream(UpstreamError),
    /// Dispatcher stopped before the task completed.
    Closed(String),
    /// Task closure panicked; the panic message is kept.
    Panicked(String),
}

impl fmt::Display for RateLimitErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitErrorKind::LimitExceeded(exceeded) => {
                write!(f, "Rate limit exceeded: {}", exceeded)
            }
            RateLimitErrorKind::Upstream(err) => write!(f, "Upstream call failed: {}", err),
            RateLimitErrorKind::Closed(msg) => write!(f, "Dispatcher closed: {}", msg),
            RateLimitErrorKind::Panicked(msg) => write!(f, "Task panicked: {}", msg),
        }
    }
}

/// Dispatch error with location tracking.
#[derive(Debug, Clone)]
pub struct RateLimitError {
    kind: RateLimitErrorKind,
    line: u32,
    file: &'static str,
}

impl RateLimitError {
    /// Create a new dispatch error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RateLimitErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &RateLimitErrorKind {
        &self.kind
    }

    /// Whether the task was refused because the platform is rate limited.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self.kind, RateLimitErrorKind::LimitExceeded(_))
    }

    /// Cooldown details, if this is a rate limit error.
    pub fn rate_limit(&self) -> Option<&RateLimitExceeded> {
        match &self.kind {
            RateLimitErrorKind::LimitExceeded(exceeded) => Some(exceeded),
            _ => None,
        }
    }

    /// Time the platform is expected to accept calls again, if rate limited.
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        self.rate_limit().map(|exceeded| exceeded.reset_at)
    }

    /// The upstream failure, if the task failed on its own.
    pub fn upstream(&self) -> Option<&UpstreamError> {
        match &self.kind {
            RateLimitErrorKind::Upstream(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rate Limit Error: {} at line {} in {}",
            self.kind, self.line, self.file
        )
    }
}

impl std::error::Error for RateLimitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            RateLimitErrorKind::Upstream(err) => Some(err),
            _ => None,
        }
    }
}

impl<T> From<T> for RateLimitError
where
    T: Into<RateLimitErrorKind>,
{
    #[track_caller]
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for dispatch operations.
pub type RateLimitResult<T> = std::result::Result<T, RateLimitError>;
