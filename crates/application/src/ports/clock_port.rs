//! Clock port
//!
//! Wall-clock source for timestamps the collection cycle records.

use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;

/// Port for reading the current time
#[cfg_attr(test, automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// [`ClockPort`] backed by `Utc::now`
#[derive(Debug, Clone, Copy, Default)]
pub struct UtcClock;

impl ClockPort for UtcClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
