//! Collection cadence
//!
//! Two modes:
//! - fixed interval: wait `interval` after each cycle completes, so a slow
//!   cycle pushes the next one back and cycles never overlap
//! - hourly: fire at the top of every wall-clock hour
//!
//! Both wait toward an absolute target in bounded chunks and re-read the
//! clock after every chunk. A late wake-up therefore shortens the next
//! chunk instead of accumulating, and drift stays bounded over days of
//! uptime. Every chunk races the shutdown token.

mod clock;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

pub use clock::{Clock, SystemClock};

const SECS_PER_HOUR: i64 = 3600;

/// Scheduler errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Interval mode with a zero interval
    #[error("Interval must be greater than zero")]
    ZeroInterval,

    /// Chunked waits need a positive chunk length
    #[error("Maximum sleep chunk must be greater than zero")]
    ZeroChunk,
}

/// When cycles fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Fixed delay after each completed cycle
    Interval(Duration),
    /// Top of every wall-clock hour (UTC)
    Hourly,
}

/// Outcome of waiting for the next cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Time to run a cycle
    Fire {
        /// Clock reading at the moment the wait ended
        at: DateTime<Utc>,
    },
    /// Shutdown was requested during the wait
    Shutdown,
}

/// First hour boundary strictly after `now`
#[must_use]
pub fn next_hour_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    let secs = now.timestamp();
    let next = secs - secs.rem_euclid(SECS_PER_HOUR) + SECS_PER_HOUR;
    DateTime::from_timestamp(next, 0).unwrap_or(now + TimeDelta::hours(1))
}

/// Drives one location's cycle cadence
#[derive(Debug, Clone)]
pub struct Scheduler {
    cadence: Cadence,
    max_chunk: Duration,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
}

impl Scheduler {
    /// Create a scheduler
    ///
    /// # Errors
    ///
    /// Returns an error for a zero interval or a zero chunk length.
    pub fn new(
        cadence: Cadence,
        max_chunk: Duration,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
    ) -> Result<Self, SchedulerError> {
        if cadence == Cadence::Interval(Duration::ZERO) {
            return Err(SchedulerError::ZeroInterval);
        }
        if max_chunk.is_zero() {
            return Err(SchedulerError::ZeroChunk);
        }
        Ok(Self {
            cadence,
            max_chunk,
            clock,
            shutdown,
        })
    }

    #[must_use]
    pub const fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Wait until the next cycle is due
    ///
    /// Call after a cycle has completed (or at startup to skip the
    /// immediate first run).
    pub async fn wait_for_next(&self) -> Tick {
        let now = self.clock.now();
        let target = match self.cadence {
            Cadence::Hourly => next_hour_boundary(now),
            Cadence::Interval(interval) => TimeDelta::from_std(interval)
                .ok()
                .and_then(|delta| now.checked_add_signed(delta))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        debug!(next = %target, "Waiting for next cycle");
        self.wait_until(target).await
    }

    /// Wait until `target`, sleeping at most `max_chunk` at a time
    pub async fn wait_until(&self, target: DateTime<Utc>) -> Tick {
        loop {
            if self.shutdown.is_cancelled() {
                return Tick::Shutdown;
            }
            let now = self.clock.now();
            let Ok(remaining) = (target - now).to_std() else {
                return Tick::Fire { at: now };
            };
            if remaining.is_zero() {
                return Tick::Fire { at: now };
            }
            let chunk = remaining.min(self.max_chunk);
            trace!(remaining_ms = ?remaining.as_millis(), "Sleeping");
            if !self.sleep(chunk).await {
                return Tick::Shutdown;
            }
        }
    }

    /// Sleep unless shutdown fires first; `false` means shutdown
    async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => false,
            () = self.clock.sleep(duration) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use parking_lot::Mutex;

    /// Clock whose sleeps overshoot by an irregular lag
    #[derive(Debug)]
    struct LaggyClock {
        now: Mutex<DateTime<Utc>>,
        lags_ms: Vec<i64>,
        sleeps: Mutex<Vec<Duration>>,
    }

    impl LaggyClock {
        fn new(start: DateTime<Utc>, lags_ms: Vec<i64>) -> Self {
            Self {
                now: Mutex::new(start),
                lags_ms,
                sleeps: Mutex::new(Vec::new()),
            }
        }

        fn advance(&self, by: TimeDelta) {
            *self.now.lock() += by;
        }

        fn longest_sleep(&self) -> Duration {
            self.sleeps.lock().iter().copied().max().unwrap_or_default()
        }
    }

    #[async_trait::async_trait]
    impl Clock for LaggyClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock()
        }

        async fn sleep(&self, duration: Duration) {
            let count = {
                let mut sleeps = self.sleeps.lock();
                sleeps.push(duration);
                sleeps.len()
            };
            let lag = if self.lags_ms.is_empty() {
                0
            } else {
                self.lags_ms[count % self.lags_ms.len()]
            };
            self.advance(TimeDelta::from_std(duration).unwrap() + TimeDelta::milliseconds(lag));
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 17, 23).unwrap()
    }

    fn scheduler(cadence: Cadence, clock: Arc<dyn Clock>, shutdown: CancellationToken) -> Scheduler {
        Scheduler::new(cadence, Duration::from_secs(60), clock, shutdown).unwrap()
    }

    #[test]
    fn test_next_hour_boundary() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 14, 59, 59).unwrap();
        assert_eq!(
            next_hour_boundary(at),
            Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap()
        );
        let on = Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap();
        assert_eq!(
            next_hour_boundary(on),
            Utc.with_ymd_and_hms(2024, 3, 1, 16, 0, 0).unwrap()
        );
        let sub = on + TimeDelta::milliseconds(300);
        assert_eq!(
            next_hour_boundary(sub),
            Utc.with_ymd_and_hms(2024, 3, 1, 16, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_rejects_zero_interval_and_chunk() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let err = Scheduler::new(
            Cadence::Interval(Duration::ZERO),
            Duration::from_secs(60),
            Arc::clone(&clock),
            CancellationToken::new(),
        )
        .unwrap_err();
        assert_eq!(err, SchedulerError::ZeroInterval);

        let err = Scheduler::new(Cadence::Hourly, Duration::ZERO, clock, CancellationToken::new())
            .unwrap_err();
        assert_eq!(err, SchedulerError::ZeroChunk);
    }

    #[tokio::test]
    async fn test_hourly_stays_aligned_over_a_day() {
        // Wake-ups overshoot by up to 1.9s in an irregular pattern
        let lags = vec![0, 1900, 250, 1200, 7, 800, 1500, 30, 1899, 420, 0, 999];
        let clock = Arc::new(LaggyClock::new(start(), lags));
        let scheduler = scheduler(Cadence::Hourly, clock.clone(), CancellationToken::new());
        // Cycle durations vary from instant to several minutes
        let work = [0, 4, 37, 190, 12, 61, 3];

        let first = next_hour_boundary(start());
        for hour in 0..24 {
            let Tick::Fire { at } = scheduler.wait_for_next().await else {
                panic!("unexpected shutdown");
            };
            let boundary = first + TimeDelta::hours(hour);
            let drift = (at - boundary).num_milliseconds().abs();
            assert!(drift <= 2000, "hour {hour}: fired at {at}, drift {drift}ms");

            clock.advance(TimeDelta::seconds(work[hour as usize % work.len()]));
        }

        assert!(clock.longest_sleep() <= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_late_wakeup_past_boundary_fires_immediately() {
        let clock = Arc::new(LaggyClock::new(start(), vec![120_000]));
        let scheduler = scheduler(Cadence::Hourly, clock.clone(), CancellationToken::new());
        let target = start() + TimeDelta::seconds(30);

        let tick = scheduler.wait_until(target).await;

        assert_eq!(clock.sleeps.lock().len(), 1);
        assert!(matches!(tick, Tick::Fire { at } if at > target));
    }

    #[tokio::test]
    async fn test_interval_counts_from_cycle_completion() {
        let clock = Arc::new(LaggyClock::new(start(), Vec::new()));
        let scheduler = scheduler(
            Cadence::Interval(Duration::from_secs(300)),
            clock.clone(),
            CancellationToken::new(),
        );

        // A slow 45s cycle
        clock.advance(TimeDelta::seconds(45));
        let Tick::Fire { at } = scheduler.wait_for_next().await else {
            panic!("unexpected shutdown");
        };

        assert_eq!(at, start() + TimeDelta::seconds(345));
        assert_eq!(clock.sleeps.lock().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_wait() {
        let shutdown = CancellationToken::new();
        let scheduler = scheduler(Cadence::Hourly, Arc::new(SystemClock), shutdown.clone());
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        let tick = scheduler.wait_for_next().await;

        assert_eq!(tick, Tick::Shutdown);
        assert!(started.elapsed() < Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_cancelled_token_returns_without_sleeping() {
        let clock = Arc::new(LaggyClock::new(start(), Vec::new()));
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let scheduler = scheduler(Cadence::Hourly, clock.clone(), shutdown);

        assert_eq!(scheduler.wait_for_next().await, Tick::Shutdown);
        assert!(clock.sleeps.lock().is_empty());
    }
}
