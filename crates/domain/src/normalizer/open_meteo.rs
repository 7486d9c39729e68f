//! Open-Meteo response shapes
//!
//! Two layouts are understood: the `current` block (with the `hourly` series
//! as a per-field fallback) and the legacy `current_weather` block.

use serde_json::Value;

use super::Observation;
use super::fields::{self, MS_TO_KMH};
use crate::value_objects::WeatherCondition;

const MPH_TO_KMH: f64 = 1.609_344;
const KNOTS_TO_KMH: f64 = 1.852;

/// Normalize a response carrying a `current` block
pub(super) fn from_current(raw: &Value, current: &Value) -> Observation {
    let offset = utc_offset(raw);
    let time = current.get("time").and_then(Value::as_str);
    let hourly = Hourly::from_response(raw);
    let series = |names: &[&str]| hourly.as_ref().and_then(|h| h.value(names, time));

    let temperature_c = fields::number(current.get("temperature_2m"))
        .or_else(|| series(&["temperature_2m"]));
    let humidity = fields::number(current.get("relative_humidity_2m"))
        .or_else(|| series(&["relative_humidity_2m", "relativehumidity_2m"]));
    let wind = fields::number(current.get("wind_speed_10m"))
        .or_else(|| series(&["wind_speed_10m", "windspeed_10m"]));
    let precipitation_mm =
        fields::number(current.get("precipitation")).or_else(|| series(&["precipitation"]));
    let code = fields::condition_code(current.get("weather_code"))
        .or_else(|| series(&["weather_code", "weathercode"]).and_then(whole_code));

    let unit = raw
        .pointer("/current_units/wind_speed_10m")
        .and_then(Value::as_str);

    Observation {
        observed_at: fields::timestamp(current.get("time"), offset),
        temperature_c,
        humidity_pct: humidity.map(fields::humidity_pct),
        wind_speed_kmh: wind.and_then(|w| fields::round2(w * wind_factor(unit, 1.0))),
        precipitation_mm,
        condition_code: code,
        condition: code.map(|c| WeatherCondition::from_wmo_code(i64::from(c))),
    }
}

/// Normalize a response carrying the legacy `current_weather` block
///
/// Legacy wind speed is reported in m/s unless the unit block says otherwise.
/// Humidity is not part of the block and comes from the hourly series.
pub(super) fn from_current_weather(raw: &Value, block: &Value) -> Observation {
    let offset = utc_offset(raw);
    let time = block.get("time").and_then(Value::as_str);
    let hourly = Hourly::from_response(raw);
    let series = |names: &[&str]| hourly.as_ref().and_then(|h| h.value(names, time));

    let code = fields::condition_code(block.get("weathercode"))
        .or_else(|| fields::condition_code(block.get("weather_code")));
    let unit = raw
        .pointer("/current_weather_units/windspeed")
        .and_then(Value::as_str);

    Observation {
        observed_at: fields::timestamp(block.get("time"), offset),
        temperature_c: fields::number(block.get("temperature")),
        humidity_pct: series(&["relativehumidity_2m", "relative_humidity_2m"])
            .map(fields::humidity_pct),
        wind_speed_kmh: fields::number(block.get("windspeed"))
            .and_then(|w| fields::round2(w * wind_factor(unit, MS_TO_KMH))),
        precipitation_mm: series(&["precipitation"]),
        condition_code: code,
        condition: code.map(|c| WeatherCondition::from_wmo_code(i64::from(c))),
    }
}

fn utc_offset(raw: &Value) -> i64 {
    fields::integer(raw.get("utc_offset_seconds")).unwrap_or(0)
}

/// Multiplier turning a wind speed in `unit` into km/h
fn wind_factor(unit: Option<&str>, default: f64) -> f64 {
    match unit.map(str::trim) {
        Some("km/h" | "kmh") => 1.0,
        Some("m/s" | "ms") => MS_TO_KMH,
        Some("mp/h" | "mph") => MPH_TO_KMH,
        Some("kn" | "knots") => KNOTS_TO_KMH,
        _ => default,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn whole_code(value: f64) -> Option<i32> {
    (value.fract() == 0.0 && value.abs() <= f64::from(i32::MAX)).then_some(value as i32)
}

/// View over the `hourly` series
struct Hourly<'a> {
    block: &'a Value,
    times: &'a [Value],
}

impl<'a> Hourly<'a> {
    fn from_response(raw: &'a Value) -> Option<Self> {
        let block = raw.get("hourly")?;
        let times = block.get("time")?.as_array()?;
        Some(Self { block, times })
    }

    /// Value of the first series in `names` for the hour matching `time`
    ///
    /// A null at the matching hour falls back to the closest earlier value;
    /// without a matching hour the latest non-null value is used.
    fn value(&self, names: &[&str], time: Option<&str>) -> Option<f64> {
        let index = time.and_then(|t| self.index_of(t));
        names.iter().find_map(|name| {
            let series = self.block.get(*name)?.as_array()?;
            let upto = index.map_or(series.len(), |i| (i + 1).min(series.len()));
            series[..upto]
                .iter()
                .rev()
                .find_map(|v| fields::number(Some(v)))
        })
    }

    fn index_of(&self, time: &str) -> Option<usize> {
        let exact = self.times.iter().position(|t| t.as_str() == Some(time));
        exact.or_else(|| {
            let hour = time.get(..13)?;
            self.times
                .iter()
                .position(|t| t.as_str().is_some_and(|s| s.starts_with(hour)))
        })
    }
}
