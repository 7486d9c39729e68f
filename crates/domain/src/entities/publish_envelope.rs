//! Broker wire unit

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::WeatherReading;
use crate::errors::DomainError;
use crate::value_objects::WeatherProvider;

/// Version of the envelope JSON layout
pub const SCHEMA_VERSION: u32 = 1;

/// One delivery attempt of a reading to the broker
///
/// Envelopes are values: a republish after a publish-time failure creates a
/// new envelope via [`PublishEnvelope::next_attempt`] rather than mutating the
/// original. `delivery_attempt` is diagnostic only and never a dedup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishEnvelope {
    schema_version: u32,
    published_at: DateTime<Utc>,
    delivery_attempt: u32,
    source: WeatherProvider,
    payload: WeatherReading,
}

impl PublishEnvelope {
    /// Wrap a reading for its first delivery attempt
    #[must_use]
    pub fn first(payload: WeatherReading, source: WeatherProvider, now: DateTime<Utc>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            published_at: now.trunc_subsecs(0),
            delivery_attempt: 1,
            source,
            payload,
        }
    }

    /// Envelope for the forced republish following a failed attempt
    #[must_use]
    pub fn next_attempt(&self, now: DateTime<Utc>) -> Self {
        Self {
            schema_version: self.schema_version,
            published_at: now.trunc_subsecs(0),
            delivery_attempt: self.delivery_attempt.saturating_add(1),
            source: self.source,
            payload: self.payload.clone(),
        }
    }

    #[must_use]
    pub const fn schema_version(&self) -> u32 {
        self.schema_version
    }

    #[must_use]
    pub const fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    #[must_use]
    pub const fn delivery_attempt(&self) -> u32 {
        self.delivery_attempt
    }

    #[must_use]
    pub const fn source(&self) -> WeatherProvider {
        self.source
    }

    #[must_use]
    pub const fn payload(&self) -> &WeatherReading {
        &self.payload
    }

    /// Encode as the UTF-8 JSON message body
    pub fn to_json(&self) -> Result<Vec<u8>, DomainError> {
        Ok(serde_json::to_vec(self)?)
    }
}
