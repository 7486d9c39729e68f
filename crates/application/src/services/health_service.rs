//! Health reporting
//!
//! Readiness is derived from two facts: how long ago each location last
//! published successfully, and the broker connection state.

use chrono::{DateTime, Duration, Utc};
use domain::value_objects::ConnectionState;
use serde::{Deserialize, Serialize};

/// Collection status of one location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationHealth {
    /// Location name
    pub location: String,
    /// Cycles started, including failed ones
    pub cycles_run: u64,
    /// Cycles that produced no message
    pub cycles_failed: u64,
    /// When a reading was last accepted by the broker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success_at: Option<DateTime<Utc>>,
    /// Seconds since `last_success_at`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_since_last_success: Option<i64>,
}

impl LocationHealth {
    /// Build a snapshot relative to `now`
    #[must_use]
    pub fn new(
        location: impl Into<String>,
        cycles_run: u64,
        cycles_failed: u64,
        last_success_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            location: location.into(),
            cycles_run,
            cycles_failed,
            last_success_at,
            seconds_since_last_success: last_success_at.map(|at| (now - at).num_seconds().max(0)),
        }
    }

    /// Whether the last success is no older than `max_staleness`
    #[must_use]
    pub fn is_fresh(&self, max_staleness: Duration) -> bool {
        self.seconds_since_last_success
            .is_some_and(|secs| secs <= max_staleness.num_seconds())
    }
}

/// Health snapshot of the whole collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorHealth {
    /// Broker connection state
    pub connection: ConnectionState,
    /// Per-location collection status
    pub locations: Vec<LocationHealth>,
    /// Timestamp of the snapshot
    pub checked_at: DateTime<Utc>,
}

impl CollectorHealth {
    #[must_use]
    pub const fn new(
        connection: ConnectionState,
        locations: Vec<LocationHealth>,
        checked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            connection,
            locations,
            checked_at,
        }
    }

    /// Ready when the broker is connected and every location published
    /// within `max_staleness`
    #[must_use]
    pub fn is_ready(&self, max_staleness: Duration) -> bool {
        self.connection.is_ready()
            && !self.locations.is_empty()
            && self.locations.iter().all(|l| l.is_fresh(max_staleness))
    }

    /// Look up the status of a location by name
    #[must_use]
    pub fn location(&self, name: &str) -> Option<&LocationHealth> {
        self.locations.iter().find(|l| l.location == name)
    }
}
