//! Time sources for expiration checks

use parking_lot::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Supplies the current time in whole seconds.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> u64;
}

/// Wall clock, seconds since the Unix epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        // A clock set before 1970 reads as 0 rather than failing.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Manually driven clock for tests and scripted runs.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: RwLock<u64>,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn set(&self, secs: u64) {
        *self.now.write() = secs;
    }

    /// Move forward by `secs`, saturating at `u64::MAX`.
    pub fn advance(&self, secs: u64) -> u64 {
        let mut now = self.now.write();
        *now = now.saturating_add(secs);
        *now
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> u64 {
        *self.now.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_only_when_told() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now_secs(), 100);
        assert_eq!(clock.advance(50), 150);
        clock.set(10);
        assert_eq!(clock.now_secs(), 10);
        assert_eq!(clock.advance(u64::MAX), u64::MAX);
    }

    #[test]
    fn system_clock_is_past_2020() {
        assert!(SystemClock.now_secs() > 1_577_836_800);
    }
}
