//! OpenWeather current-weather shape (`units=metric`)

use serde_json::Value;

use super::Observation;
use super::fields;
use crate::value_objects::WeatherCondition;

pub(super) fn from_response(raw: &Value) -> Observation {
    let code = fields::condition_code(raw.pointer("/weather/0/id"));
    let precipitation_mm = fields::number(raw.pointer("/rain/1h"))
        .or_else(|| fields::number(raw.pointer("/snow/1h")));

    Observation {
        observed_at: fields::unix_seconds(raw.get("dt")),
        temperature_c: fields::number(raw.pointer("/main/temp")),
        humidity_pct: fields::number(raw.pointer("/main/humidity")).map(fields::humidity_pct),
        wind_speed_kmh: fields::number(raw.pointer("/wind/speed")).and_then(fields::ms_to_kmh),
        precipitation_mm,
        condition_code: code,
        condition: code.map(|c| WeatherCondition::from_openweather_id(i64::from(c))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metric_response() {
        let raw = json!({
            "dt": 1_709_301_600,
            "main": {"temp": 24.1, "humidity": 68},
            "wind": {"speed": 3.1},
            "rain": {"1h": 0.6},
            "weather": [{"id": 500, "description": "light rain"}]
        });
        let obs = from_response(&raw);
        assert_eq!(obs.temperature_c, Some(24.1));
        assert_eq!(obs.humidity_pct, Some(68));
        assert_eq!(obs.wind_speed_kmh, Some(11.16));
        assert_eq!(obs.precipitation_mm, Some(0.6));
        assert_eq!(obs.condition_code, Some(500));
        assert_eq!(obs.condition, Some(WeatherCondition::Rain));
        assert_eq!(
            obs.observed_at.map(|t| t.to_rfc3339()),
            Some("2024-03-01T14:00:00+00:00".to_string())
        );
    }

    #[test]
    fn dry_response_has_no_precipitation() {
        let raw = json!({"main": {"temp": 10.0}, "weather": []});
        let obs = from_response(&raw);
        assert_eq!(obs.precipitation_mm, None);
        assert_eq!(obs.condition_code, None);
        assert_eq!(obs.observed_at, None);
    }
}
