//! Wall-clock abstraction for the scheduler

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Source of wall-clock time and sleeps
///
/// The scheduler re-reads `now()` after every sleep, so an implementation
/// whose sleeps overshoot (as real ones do under load) is fine.
#[async_trait]
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;

    /// Sleep for roughly `duration`
    async fn sleep(&self, duration: Duration);
}

/// System clock backed by `Utc::now` and the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
