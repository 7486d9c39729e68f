//! Canonical weather reading

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Location;

/// Provider-agnostic weather observation for one location
///
/// `collected_at` is always set; every measurement is optional because
/// providers differ in what they report. Absent values serialize as `null`.
/// Consumers deduplicate on `(location.name, collected_at)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// Observation time reported by the provider, or fetch time if absent
    pub collected_at: DateTime<Utc>,
    /// Where the reading was taken
    pub location: Location,
    /// Air temperature in Celsius
    pub temperature_c: Option<f64>,
    /// Relative humidity percentage (0-100)
    pub humidity_pct: Option<u8>,
    /// Wind speed in km/h
    pub wind_speed_kmh: Option<f64>,
    /// Precipitation in mm
    pub precipitation_mm: Option<f64>,
    /// Provider condition code (WMO code or OpenWeather id)
    pub condition_code: Option<i32>,
    /// Canonical condition text, `"unknown"` for unmapped codes
    pub condition_text: Option<String>,
}

impl WeatherReading {
    /// Create a reading with no measurements
    #[must_use]
    pub const fn empty(location: Location, collected_at: DateTime<Utc>) -> Self {
        Self {
            collected_at,
            location,
            temperature_c: None,
            humidity_pct: None,
            wind_speed_kmh: None,
            precipitation_mm: None,
            condition_code: None,
            condition_text: None,
        }
    }

    /// Key consumers use to drop duplicate deliveries
    #[must_use]
    pub fn dedup_key(&self) -> (&str, DateTime<Utc>) {
        (self.location.name(), self.collected_at)
    }

    /// Whether at least one measurement is present
    #[must_use]
    pub const fn has_measurements(&self) -> bool {
        self.temperature_c.is_some()
            || self.humidity_pct.is_some()
            || self.wind_speed_kmh.is_some()
            || self.precipitation_mm.is_some()
            || self.condition_code.is_some()
    }
}
