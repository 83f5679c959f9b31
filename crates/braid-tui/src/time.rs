//! Injectable time for timeouts.
//!
//! The chord matcher and the test harness both compare "now" against
//! deadlines. Going through a trait lets tests drive a virtual clock
//! instead of sleeping.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A monotonic clock.
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed epoch.
    fn now(&self) -> Duration;

    /// Block the current thread for roughly `d`. The test clock
    /// advances itself instead, so polling loops terminate without
    /// real sleeping.
    fn park(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

/// The real monotonic clock.
#[derive(Clone, Debug)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    /// Create a clock with its epoch at construction time.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// A manually advanced clock for tests.
#[derive(Clone, Debug, Default)]
pub struct TestClock {
    now: Arc<Mutex<Duration>>,
}

impl TestClock {
    /// Create a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for TestClock {
    fn now(&self) -> Duration {
        self.now.lock().map(|d| *d).unwrap_or_default()
    }

    fn park(&self, d: Duration) {
        self.advance(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn test_clock_advances_manually() {
        let clock = TestClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
        clock.advance(Duration::from_millis(300));
        assert_eq!(clock.now(), Duration::from_millis(300));
        let cloned = clock.clone();
        cloned.advance(Duration::from_millis(200));
        assert_eq!(clock.now(), Duration::from_millis(500));
    }
}
