//! Debounced recompute scheduling.
//!
//! Opening a single window produces a handful of X events (create, map,
//! several property changes, configure).  [`Debounce`] collapses such a
//! burst into one recompute that fires `interval` after the *last* event.
//!
//! The type never reads the clock itself; callers pass `now`, which keeps
//! it deterministic under test.

use std::time::{Duration, Instant};

/// Default quiet period before a recompute fires.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(200);

/// A resettable one-shot deadline.
#[derive(Debug, Clone)]
pub struct Debounce {
    interval: Duration,
    due: Option<Instant>,
}

impl Debounce {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            due: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The pending deadline, if any.
    pub fn due(&self) -> Option<Instant> {
        self.due
    }

    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    /// Record a change observed at `now`, pushing the deadline to
    /// `now + interval`.  Any earlier deadline is replaced.
    pub fn notify(&mut self, now: Instant) {
        self.due = Some(now + self.interval);
    }

    /// Returns `true` exactly once per burst, on the first call at or after
    /// the deadline.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for Debounce {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn idle_never_fires() {
        let mut d = Debounce::new(200 * MS);
        let t0 = Instant::now();
        assert!(!d.is_pending());
        assert!(!d.fire(t0));
        assert!(!d.fire(t0 + 10_000 * MS));
    }

    #[test]
    fn fires_after_interval() {
        let mut d = Debounce::new(200 * MS);
        let t0 = Instant::now();
        d.notify(t0);
        assert_eq!(d.due(), Some(t0 + 200 * MS));
        assert!(!d.fire(t0));
        assert!(!d.fire(t0 + 199 * MS));
        assert!(d.fire(t0 + 200 * MS));
        assert!(!d.is_pending());
    }

    #[test]
    fn fires_only_once() {
        let mut d = Debounce::new(50 * MS);
        let t0 = Instant::now();
        d.notify(t0);
        assert!(d.fire(t0 + 60 * MS));
        assert!(!d.fire(t0 + 70 * MS));
        assert!(!d.fire(t0 + 500 * MS));
    }

    #[test]
    fn burst_coalesces_to_last_notification() {
        let mut d = Debounce::new(200 * MS);
        let t0 = Instant::now();
        let mut fired = 0;
        // Ten notifications 20ms apart, ticking every 10ms.
        let mut t = t0;
        for i in 0..10u32 {
            d.notify(t0 + i * 20 * MS);
            for _ in 0..2 {
                if d.fire(t) {
                    fired += 1;
                }
                t += 10 * MS;
            }
        }
        assert_eq!(fired, 0);
        assert_eq!(d.due(), Some(t0 + 180 * MS + 200 * MS));
        while t < t0 + 1000 * MS {
            if d.fire(t) {
                fired += 1;
                assert!(t >= t0 + 380 * MS);
            }
            t += 10 * MS;
        }
        assert_eq!(fired, 1);
    }

    #[test]
    fn zero_interval_fires_on_next_check() {
        let mut d = Debounce::new(Duration::ZERO);
        let t0 = Instant::now();
        d.notify(t0);
        assert!(d.fire(t0));
    }
}
