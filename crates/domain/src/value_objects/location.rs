//! Monitored location value object

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error type for locations that fail validation
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InvalidLocation {
    /// Name is empty or whitespace
    #[error("Invalid location: name must not be empty")]
    EmptyName,

    /// Latitude outside [-90, 90] or not finite
    #[error("Invalid location: latitude {0} must be -90 to 90")]
    Latitude(f64),

    /// Longitude outside [-180, 180] or not finite
    #[error("Invalid location: longitude {0} must be -180 to 180")]
    Longitude(f64),
}

/// A named point whose weather is collected
///
/// Coordinates are validated on construction (and on deserialization), so a
/// `Location` held anywhere in the pipeline always has a latitude in
/// [-90, 90] and a longitude in [-180, 180].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LocationRecord")]
pub struct Location {
    name: String,
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct LocationRecord {
    name: String,
    latitude: f64,
    longitude: f64,
}

impl TryFrom<LocationRecord> for Location {
    type Error = InvalidLocation;

    fn try_from(record: LocationRecord) -> Result<Self, Self::Error> {
        Self::new(record.name, record.latitude, record.longitude)
    }
}

impl Location {
    /// Create a new location with validation
    ///
    /// # Errors
    ///
    /// Returns `InvalidLocation` if the name is blank, latitude is not in
    /// [-90, 90] or longitude is not in [-180, 180].
    pub fn new(
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self, InvalidLocation> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(InvalidLocation::EmptyName);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(InvalidLocation::Latitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(InvalidLocation::Longitude(longitude));
        }
        Ok(Self {
            name,
            latitude,
            longitude,
        })
    }

    /// Display name, also the first half of the consumer dedup key
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Latitude in degrees
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.4}, {:.4})",
            self.name, self.latitude, self.longitude
        )
    }
}
