//! Collection service
//!
//! Runs one fetch, normalize and publish cycle for a single location. This
//! is the only place in the pipeline where errors are swallowed: every
//! failure is logged with its cycle number and stage, and the caller always
//! gets an outcome back so the next cycle can be scheduled.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain::entities::PublishEnvelope;
use domain::normalizer::normalize_with_report;
use domain::value_objects::{Location, PublishOutcome};
use parking_lot::Mutex;
use tracing::{Span, debug, field, info, instrument, warn};

use crate::error::ApplicationError;
use crate::ports::{ClockPort, ReadingPublisherPort, UtcClock, WeatherSourcePort};
use crate::services::health_service::LocationHealth;

/// Pipeline stage a cycle was in when it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    Fetch,
    Normalize,
    Publish,
}

impl CycleStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Normalize => "normalize",
            Self::Publish => "publish",
        }
    }
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one collection cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Reading accepted by the broker
    Published {
        /// Observation time of the published reading
        collected_at: DateTime<Utc>,
    },
    /// No message was produced this cycle
    Failed {
        /// Stage that failed
        stage: CycleStage,
    },
    /// Shutdown interrupted the cycle
    Cancelled,
}

impl CycleOutcome {
    #[must_use]
    pub const fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

#[derive(Debug, Default)]
struct CycleStats {
    cycles_run: u64,
    cycles_failed: u64,
    last_success_at: Option<DateTime<Utc>>,
}

/// Collection cycle for one location
///
/// Cycles for the same location must not overlap; callers run them
/// sequentially. Sources and publishers may be shared between services.
pub struct CollectionService {
    location: Location,
    source: Arc<dyn WeatherSourcePort>,
    publisher: Arc<dyn ReadingPublisherPort>,
    clock: Arc<dyn ClockPort>,
    stats: Mutex<CycleStats>,
}

impl fmt::Debug for CollectionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionService")
            .field("location", &self.location)
            .field("provider", &self.source.provider())
            .field("stats", &*self.stats.lock())
            .finish_non_exhaustive()
    }
}

impl CollectionService {
    /// Create a collection service for a location
    #[must_use]
    pub fn new(
        location: Location,
        source: Arc<dyn WeatherSourcePort>,
        publisher: Arc<dyn ReadingPublisherPort>,
    ) -> Self {
        Self {
            location,
            source,
            publisher,
            clock: Arc::new(UtcClock),
            stats: Mutex::new(CycleStats::default()),
        }
    }

    /// Record timestamps from `clock` instead of the system clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn ClockPort>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub const fn location(&self) -> &Location {
        &self.location
    }

    /// Run one cycle to completion
    #[instrument(
        name = "cycle",
        skip(self),
        fields(location = %self.location.name(), cycle = field::Empty)
    )]
    pub async fn run_cycle(&self) -> CycleOutcome {
        let cycle = {
            let mut stats = self.stats.lock();
            stats.cycles_run += 1;
            stats.cycles_run
        };
        Span::current().record("cycle", cycle);

        let outcome = self.execute(cycle).await;

        let mut stats = self.stats.lock();
        match outcome {
            CycleOutcome::Published { .. } => stats.last_success_at = Some(self.clock.now()),
            CycleOutcome::Failed { .. } => stats.cycles_failed += 1,
            CycleOutcome::Cancelled => {},
        }
        outcome
    }

    async fn execute(&self, cycle: u64) -> CycleOutcome {
        let raw = match self.source.fetch(&self.location).await {
            Ok(raw) => raw,
            Err(ApplicationError::Cancelled) => {
                info!(cycle, stage = %CycleStage::Fetch, "Cycle interrupted by shutdown");
                return CycleOutcome::Cancelled;
            },
            Err(e) => {
                warn!(
                    cycle,
                    stage = %CycleStage::Fetch,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Cycle produced no reading"
                );
                return CycleOutcome::Failed {
                    stage: CycleStage::Fetch,
                };
            },
        };

        let normalized = normalize_with_report(&raw, &self.location, self.clock.now());
        for missing in &normalized.missing {
            debug!(cycle, stage = %CycleStage::Normalize, field = *missing, "Field absent from response");
        }
        let reading = normalized.reading;
        let collected_at = reading.collected_at;

        let envelope = PublishEnvelope::first(reading, self.source.provider(), self.clock.now());
        match self.publisher.publish(envelope).await {
            PublishOutcome::Delivered => {
                info!(cycle, %collected_at, "Reading published");
                CycleOutcome::Published { collected_at }
            },
            PublishOutcome::Cancelled => {
                info!(cycle, stage = %CycleStage::Publish, "Cycle interrupted by shutdown");
                CycleOutcome::Cancelled
            },
            PublishOutcome::Dropped => {
                warn!(
                    cycle,
                    stage = %CycleStage::Publish,
                    %collected_at,
                    location = %self.location.name(),
                    "Reading dropped: broker did not accept it"
                );
                CycleOutcome::Failed {
                    stage: CycleStage::Publish,
                }
            },
        }
    }

    /// When a reading for this location was last accepted by the broker
    #[must_use]
    pub fn last_success_at(&self) -> Option<DateTime<Utc>> {
        self.stats.lock().last_success_at
    }

    /// Health snapshot relative to `now`
    #[must_use]
    pub fn health(&self, now: DateTime<Utc>) -> LocationHealth {
        let stats = self.stats.lock();
        LocationHealth::new(
            self.location.name(),
            stats.cycles_run,
            stats.cycles_failed,
            stats.last_success_at,
            now,
        )
    }
}
