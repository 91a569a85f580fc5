//! Time sources for the collection window

use chrono::{DateTime, Utc};
use std::time::Instant;

/// Source of monotonic and wall-clock time
pub trait Clock {
    /// Monotonic instant used for deadline tracking
    fn now(&self) -> Instant;

    /// Wall-clock time used to stamp results
    fn wall_now(&self) -> DateTime<Utc>;
}

/// The host clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
