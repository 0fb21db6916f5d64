//! Fixed time-window call counter.

use std::time::Duration;
use tokio::time::Instant;

/// Counts admitted calls within a fixed window.
///
/// The window rolls over lazily: nothing happens on a timer, instead
/// [`QuotaWindow::roll`] is called on every admission attempt and resets the
/// counter once `now - window_start >= window_duration`.
///
/// `count <= max_per_window` is upheld by the caller only admitting when
/// [`QuotaWindow::has_capacity`] is true.
#[derive(Debug, Clone)]
pub struct QuotaWindow {
    window_start: Instant,
    window_duration: Duration,
    count: u32,
    max_per_window: u32,
}

impl QuotaWindow {
    /// Start an empty window at `now`.
    pub fn new(max_per_window: u32, window_duration: Duration, now: Instant) -> Self {
        Self {
            window_start: now,
            window_duration,
            count: 0,
            max_per_window,
        }
    }

    /// Roll the window over if it has expired. Returns true if it rolled.
    pub fn roll(&mut self, now: Instant) -> bool {
        if self.is_expired(now) {
            self.reset(now);
            true
        } else {
            false
        }
    }

    /// Whether another call may be admitted in this window.
    pub fn has_capacity(&self) -> bool {
        self.count < self.max_per_window
    }

    /// Record an admitted call.
    pub fn admit(&mut self) {
        self.count += 1;
    }

    /// Start a fresh, empty window at `now`.
    pub fn reset(&mut self, now: Instant) {
        self.count = 0;
        self.window_start = now;
    }

    /// Time left until this window expires.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.window_duration
            .saturating_sub(now.saturating_duration_since(self.window_start))
    }

    /// Calls counted as of `now`, treating an expired window as empty.
    ///
    /// Does not roll the window.
    pub fn current_count(&self, now: Instant) -> u32 {
        if self.is_expired(now) { 0 } else { self.count }
    }

    /// Calls counted since the window started.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Maximum calls per window.
    pub fn max_per_window(&self) -> u32 {
        self.max_per_window
    }

    /// Length of one window.
    pub fn window_duration(&self) -> Duration {
        self.window_duration
    }

    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.window_start) >= self.window_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_admits_up_to_cap() {
        let start = Instant::now();
        let mut window = QuotaWindow::new(2, Duration::from_secs(60), start);

        assert!(window.has_capacity());
        window.admit();
        assert!(window.has_capacity());
        window.admit();
        assert!(!window.has_capacity());
        assert_eq!(window.count(), 2);
    }

    #[test]
    fn test_window_rolls_lazily() {
        let start = Instant::now();
        let mut window = QuotaWindow::new(1, Duration::from_secs(60), start);
        window.admit();

        assert!(!window.roll(start + Duration::from_secs(59)));
        assert!(!window.has_capacity());

        let later = start + Duration::from_secs(60);
        assert!(window.roll(later));
        assert_eq!(window.count(), 0);
        assert_eq!(window.remaining(later), Duration::from_secs(60));
    }

    #[test]
    fn test_remaining_and_current_count() {
        let start = Instant::now();
        let mut window = QuotaWindow::new(5, Duration::from_secs(10), start);
        window.admit();

        assert_eq!(
            window.remaining(start + Duration::from_secs(4)),
            Duration::from_secs(6)
        );
        assert_eq!(window.current_count(start + Duration::from_secs(4)), 1);
        assert_eq!(window.current_count(start + Duration::from_secs(11)), 0);
        assert_eq!(window.remaining(start + Duration::from_secs(11)), Duration::ZERO);
        // current_count never mutates
        assert_eq!(window.count(), 1);
    }
}
