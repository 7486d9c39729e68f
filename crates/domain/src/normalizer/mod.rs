//! Normalizer - raw provider JSON to [`WeatherReading`]
//!
//! Normalization is total: any JSON value yields a reading. The response
//! shape is detected from its top-level keys, and fields that cannot be read
//! are left absent. `collected_at` falls back to the fetch time.

mod fields;
mod open_meteo;
mod open_weather;

use chrono::{DateTime, Utc};
use serde_json::Value;

pub use fields::MS_TO_KMH;

use crate::entities::WeatherReading;
use crate::value_objects::{Location, WeatherCondition};

/// Result of normalization with the names of fields left absent
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub reading: WeatherReading,
    /// Reading fields the response did not supply (`collected_at` is listed
    /// when it fell back to the fetch time)
    pub missing: Vec<&'static str>,
}

/// Measurements extracted from one provider shape
#[derive(Debug, Default)]
struct Observation {
    observed_at: Option<DateTime<Utc>>,
    temperature_c: Option<f64>,
    humidity_pct: Option<u8>,
    wind_speed_kmh: Option<f64>,
    precipitation_mm: Option<f64>,
    condition_code: Option<i32>,
    condition: Option<WeatherCondition>,
}

/// Normalize a raw provider response
pub fn normalize(raw: &Value, location: &Location, fetched_at: DateTime<Utc>) -> WeatherReading {
    normalize_with_report(raw, location, fetched_at).reading
}

/// Normalize and report which fields were absent
pub fn normalize_with_report(
    raw: &Value,
    location: &Location,
    fetched_at: DateTime<Utc>,
) -> Normalized {
    let obs = observe(raw);

    let mut missing = Vec::new();
    if obs.observed_at.is_none() {
        missing.push("collected_at");
    }
    for (name, present) in [
        ("temperature_c", obs.temperature_c.is_some()),
        ("humidity_pct", obs.humidity_pct.is_some()),
        ("wind_speed_kmh", obs.wind_speed_kmh.is_some()),
        ("precipitation_mm", obs.precipitation_mm.is_some()),
        ("condition_code", obs.condition_code.is_some()),
    ] {
        if !present {
            missing.push(name);
        }
    }

    let reading = WeatherReading {
        collected_at: obs.observed_at.unwrap_or(fetched_at),
        location: location.clone(),
        temperature_c: obs.temperature_c,
        humidity_pct: obs.humidity_pct,
        wind_speed_kmh: obs.wind_speed_kmh,
        precipitation_mm: obs.precipitation_mm,
        condition_code: obs.condition_code,
        condition_text: obs.condition.map(|c| c.as_str().to_string()),
    };

    Normalized { reading, missing }
}

fn observe(raw: &Value) -> Observation {
    if let Some(current) = raw.get("current").filter(|v| v.is_object()) {
        return open_meteo::from_current(raw, current);
    }
    if let Some(block) = raw.get("current_weather").filter(|v| v.is_object()) {
        return open_meteo::from_current_weather(raw, block);
    }
    if raw.get("main").is_some_and(Value::is_object) || raw.get("weather").is_some_and(Value::is_array)
    {
        return open_weather::from_response(raw);
    }
    Observation::default()
}
