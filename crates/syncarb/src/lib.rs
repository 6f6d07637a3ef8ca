//! Single global sync watchdog (spec §4.7).
//!
//! Fed exclusively by receipt of an Art-Net `OpSync` packet; starves after a
//! fixed timeout so a producer that stops sending sync frames falls back to
//! per-packet latching. Single writer (the sync-opcode path), single reader
//! (the data-opcode path) — a timestamp behind a lock is sufficient, no
//! lock-free primitive needed at this scale.

use std::time::{Duration, Instant};

/// Default starvation timeout: spec §3 invariant, "starves after a fixed
/// timeout (≈4 ms)".
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(4);

/// Tracks whether sync frames are still arriving.
pub struct Watchdog {
    last_fed: Option<Instant>,
    timeout: Duration,
}

impl Watchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            last_fed: None,
            timeout,
        }
    }

    /// Mark "now" as the last time a sync opcode was received.
    pub fn feed(&mut self) {
        self.last_fed = Some(Instant::now());
    }

    /// True iff never fed, or more than `timeout` has elapsed since the
    /// last feed. Observing a starved state resets the fed mark, so a
    /// subsequent immediate call observes `false` (spec §8: "first call
    /// after starved() observes true, second observes false").
    pub fn starved(&mut self) -> bool {
        let starved = match self.last_fed {
            None => true,
            Some(fed) => fed.elapsed() > self.timeout,
        };
        if starved {
            self.last_fed = Some(Instant::now());
        }
        starved
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_fed_is_starved() {
        let mut wd = Watchdog::new(Duration::from_millis(10));
        assert!(wd.starved());
    }

    #[test]
    fn observing_starved_resets_the_mark() {
        let mut wd = Watchdog::new(Duration::from_millis(10));
        assert!(wd.starved());
        assert!(!wd.starved());
    }

    #[test]
    fn fed_recently_is_not_starved() {
        let mut wd = Watchdog::new(Duration::from_millis(20));
        wd.feed();
        assert!(!wd.starved());
    }

    #[test]
    fn starves_after_timeout_elapses() {
        let mut wd = Watchdog::new(Duration::from_millis(5));
        wd.feed();
        std::thread::sleep(Duration::from_millis(15));
        assert!(wd.starved());
    }
}
