//! Inter-request pacing on the tokio clock.
//!
//! Governor's default clock reads real time, while quota windows and
//! backoff sleeps run on `tokio::time`. Driving the GCRA limiter from a
//! tokio-backed clock keeps all three on one timeline, including under a
//! paused test runtime.

use governor::clock::{Clock, Reference};
use governor::middleware::NoOpMiddleware;
use governor::nanos::Nanos;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use std::ops::Add;
use std::time::Duration;
use tokio::time::Instant;

/// A reading of the tokio clock usable by governor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct TokioInstant(Instant);

impl Add<Nanos> for TokioInstant {
    type Output = Self;

    fn add(self, other: Nanos) -> Self {
        Self(self.0 + Duration::from(other))
    }
}

impl Reference for TokioInstant {
    fn duration_since(&self, earlier: Self) -> Nanos {
        Nanos::from(self.0.saturating_duration_since(earlier.0))
    }

    fn saturating_sub(&self, duration: Nanos) -> Self {
        Self(
            self.0
                .checked_sub(Duration::from(duration))
                .unwrap_or(self.0),
        )
    }
}

/// Governor clock reading `tokio::time::Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TokioClock;

impl Clock for TokioClock {
    type Instant = TokioInstant;

    fn now(&self) -> Self::Instant {
        TokioInstant(Instant::now())
    }
}

type DirectRateLimiter =
    GovernorRateLimiter<NotKeyed, InMemoryState, TokioClock, NoOpMiddleware<TokioInstant>>;

/// Spaces consecutive dispatch starts by a minimum delay (burst of one).
pub(crate) struct Pacer {
    limiter: DirectRateLimiter,
    clock: TokioClock,
}

impl Pacer {
    /// `None` when `delay` is zero.
    pub(crate) fn new(delay: Duration) -> Option<Self> {
        let clock = TokioClock;
        Quota::with_period(delay).map(|quota| Self {
            limiter: DirectRateLimiter::direct_with_clock(quota, clock),
            clock,
        })
    }

    /// Wait until the next dispatch may start.
    pub(crate) async fn ready(&self) {
        while let Err(not_until) = self.limiter.check() {
            tokio::time::sleep(not_until.wait_time_from(self.clock.now())).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_delay_disables_pacing() {
        assert!(Pacer::new(Duration::ZERO).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_dispatch_waits_for_period() {
        let pacer = Pacer::new(Duration::from_millis(100)).expect("non-zero delay");
        let started = Instant::now();

        pacer.ready().await;
        assert_eq!(started.elapsed(), Duration::ZERO);

        pacer.ready().await;
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_instant_arithmetic_saturates() {
        let now = TokioInstant(Instant::now());
        let later = now + Nanos::from(Duration::from_millis(5));

        assert_eq!(later.duration_since(now), Nanos::from(Duration::from_millis(5)));
        assert_eq!(now.duration_since(later), Nanos::from(Duration::ZERO));
    }
}
