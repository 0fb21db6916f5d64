//! Cooldown state learned from upstream rate limit responses.

use crate::{PlatformUsage, RateLimitExceeded};
use chrono::{DateTime, Utc};

/// Known rate limit violation reported by the platform.
///
/// While `reset_at` lies in the future every submission is refused
/// immediately. Usage telemetry outlives the cooldown so status snapshots can
/// keep showing the last thing the platform reported.
#[derive(Debug, Clone, Default)]
pub struct Cooldown {
    reset_at: Option<DateTime<Utc>>,
    last_known_usage: Option<PlatformUsage>,
}

impl Cooldown {
    /// Whether a cooldown is in effect at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.reset_at.is_some_and(|reset_at| reset_at > now)
    }

    /// Drop an elapsed cooldown. Returns true if one was dropped.
    pub fn expire(&mut self, now: DateTime<Utc>) -> bool {
        if self.reset_at.is_some() && !self.is_active(now) {
            self.reset_at = None;
            true
        } else {
            false
        }
    }

    /// Enter cooldown until `reset_at`, keeping prior usage if none is given.
    pub fn enter(&mut self, reset_at: DateTime<Utc>, usage: Option<PlatformUsage>) {
        self.reset_at = Some(reset_at);
        if usage.is_some() {
            self.last_known_usage = usage;
        }
    }

    /// Lift the cooldown.
    pub fn clear(&mut self) {
        self.reset_at = None;
    }

    /// Store telemetry observed outside of a failure.
    pub fn record_usage(&mut self, usage: PlatformUsage) {
        self.last_known_usage = Some(usage);
    }

    /// Cooldown end, if one is set (it may already have elapsed).
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        self.reset_at
    }

    /// Most recent platform telemetry.
    pub fn last_known_usage(&self) -> Option<&PlatformUsage> {
        self.last_known_usage.as_ref()
    }

    /// Rejection details for `platform`, if a cooldown is active at `now`.
    pub fn exceeded(&self, platform: &str, now: DateTime<Utc>) -> Option<RateLimitExceeded> {
        let reset_at = self.reset_at.filter(|reset_at| *reset_at > now)?;
        Some(RateLimitExceeded::new(
            platform,
            reset_at,
            now,
            self.last_known_usage.clone(),
        ))
    }
}
