//! Clock abstraction so time-dependent logic can run against a simulated
//! clock in tests.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually controlled clock for tests, stored as epoch milliseconds.
#[derive(Debug)]
pub struct ManualClock {
    epoch_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            epoch_ms: AtomicI64::new(start.timestamp_millis()),
        }
    }

    /// Moves the clock forward by the given duration.
    pub fn advance(&self, duration: chrono::Duration) {
        self.epoch_ms
            .fetch_add(duration.num_milliseconds(), Ordering::SeqCst);
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        self.epoch_ms
            .store(instant.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = self.epoch_ms.load(Ordering::SeqCst);
        Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
    }
}
