//! Wall-clock source for the gate, the limiter and tick timestamps.
//!
//! Everything time-dependent reads the time through `Clock` so tests can drive
//! the broadcast loop with a hand-set clock instead of sleeping.
use chrono::{DateTime, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Current time in milliseconds since the UNIX epoch.
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Clock backed by the system time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub use manual::ManualClock;
