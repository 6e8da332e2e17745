//! Clock abstraction for time-dependent logic.
//!
//! Production code uses [`SystemClock`]; tests inject a [`MockClock`] so
//! date-sensitive behavior (daily counters, retention) can be pinned and
//! advanced deterministically.

use std::sync::RwLock;
use std::time::{Duration, SystemTime};

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// The real system clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A controllable clock for tests.
#[derive(Debug)]
pub struct MockClock {
    now: RwLock<SystemTime>,
}

impl Clock for MockClock {
    fn now(&self) -> SystemTime {
        *self.now.read().expect("lock poisoned")
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClock {
    pub fn new() -> Self {
        Self::with_time(SystemTime::now())
    }

    pub fn with_time(time: SystemTime) -> Self {
        Self {
            now: RwLock::new(time),
        }
    }

    /// Moves the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.write().expect("lock poisoned");
        *now += duration;
    }

    pub fn set_time(&self, time: SystemTime) {
        *self.now.write().expect("lock poisoned") = time;
    }
}
