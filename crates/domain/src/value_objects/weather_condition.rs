//! Weather condition lookup tables
//!
//! Maps provider-specific numeric condition codes onto one canonical set of
//! condition names. Unmapped codes become [`WeatherCondition::Unknown`]; the
//! lookups never fail.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical weather condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    /// Clear sky (WMO 0, OpenWeather 800)
    ClearSky,
    /// Mainly clear (WMO 1, OpenWeather 801)
    MainlyClear,
    /// Partly cloudy (WMO 2, OpenWeather 802)
    PartlyCloudy,
    /// Overcast (WMO 3, OpenWeather 803-804)
    Overcast,
    /// Fog, mist or haze (WMO 45, 48)
    Fog,
    /// Drizzle (WMO 51, 53, 55)
    Drizzle,
    /// Freezing drizzle (WMO 56, 57)
    FreezingDrizzle,
    /// Rain (WMO 61, 63, 65)
    Rain,
    /// Freezing rain (WMO 66, 67)
    FreezingRain,
    /// Snow (WMO 71, 73, 75)
    Snow,
    /// Snow grains (WMO 77)
    SnowGrains,
    /// Sleet or mixed rain and snow (OpenWeather 611-616)
    Sleet,
    /// Rain showers (WMO 80, 81, 82)
    RainShowers,
    /// Snow showers (WMO 85, 86)
    SnowShowers,
    /// Thunderstorm (WMO 95)
    Thunderstorm,
    /// Thunderstorm with hail (WMO 96, 99)
    ThunderstormWithHail,
    /// Code not present in the lookup table
    Unknown,
}

impl WeatherCondition {
    /// Convert a WMO weather code (as reported by Open-Meteo)
    ///
    /// See: <https://open-meteo.com/en/docs> for WMO code reference
    #[must_use]
    pub const fn from_wmo_code(code: i64) -> Self {
        match code {
            0 => Self::ClearSky,
            1 => Self::MainlyClear,
            2 => Self::PartlyCloudy,
            3 => Self::Overcast,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 => Self::FreezingDrizzle,
            61 | 63 | 65 => Self::Rain,
            66 | 67 => Self::FreezingRain,
            71 | 73 | 75 => Self::Snow,
            77 => Self::SnowGrains,
            80..=82 => Self::RainShowers,
            85 | 86 => Self::SnowShowers,
            95 => Self::Thunderstorm,
            96 | 99 => Self::ThunderstormWithHail,
            _ => Self::Unknown,
        }
    }

    /// Convert an OpenWeather condition id
    ///
    /// See: <https://openweathermap.org/weather-conditions>
    #[must_use]
    pub const fn from_openweather_id(id: i64) -> Self {
        match id {
            200..=232 => Self::Thunderstorm,
            300..=321 => Self::Drizzle,
            500..=504 => Self::Rain,
            511 => Self::FreezingRain,
            520..=531 => Self::RainShowers,
            600..=602 => Self::Snow,
            611..=616 => Self::Sleet,
            620..=622 => Self::SnowShowers,
            701 | 721 | 741 => Self::Fog,
            800 => Self::ClearSky,
            801 => Self::MainlyClear,
            802 => Self::PartlyCloudy,
            803 | 804 => Self::Overcast,
            _ => Self::Unknown,
        }
    }

    /// Canonical condition text carried in readings
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClearSky => "clear_sky",
            Self::MainlyClear => "mainly_clear",
            Self::PartlyCloudy => "partly_cloudy",
            Self::Overcast => "overcast",
            Self::Fog => "fog",
            Self::Drizzle => "drizzle",
            Self::FreezingDrizzle => "freezing_drizzle",
            Self::Rain => "rain",
            Self::FreezingRain => "freezing_rain",
            Self::Snow => "snow",
            Self::SnowGrains => "snow_grains",
            Self::Sleet => "sleet",
            Self::RainShowers => "rain_showers",
            Self::SnowShowers => "snow_showers",
            Self::Thunderstorm => "thunderstorm",
            Self::ThunderstormWithHail => "thunderstorm_with_hail",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wmo_sky_codes() {
        assert_eq!(WeatherCondition::from_wmo_code(0), WeatherCondition::ClearSky);
        assert_eq!(WeatherCondition::from_wmo_code(1), WeatherCondition::MainlyClear);
        assert_eq!(WeatherCondition::from_wmo_code(2), WeatherCondition::PartlyCloudy);
        assert_eq!(WeatherCondition::from_wmo_code(3), WeatherCondition::Overcast);
    }

    #[test]
    fn wmo_precipitation_codes() {
        for code in [61, 63, 65] {
            assert_eq!(WeatherCondition::from_wmo_code(code), WeatherCondition::Rain);
        }
        for code in [80, 81, 82] {
            assert_eq!(
                WeatherCondition::from_wmo_code(code),
                WeatherCondition::RainShowers
            );
        }
        assert_eq!(
            WeatherCondition::from_wmo_code(99),
            WeatherCondition::ThunderstormWithHail
        );
    }

    #[test]
    fn wmo_unmapped_codes_are_unknown() {
        for code in [-1, 4, 44, 100, 255, i64::MAX] {
            assert_eq!(WeatherCondition::from_wmo_code(code), WeatherCondition::Unknown);
        }
    }

    #[test]
    fn openweather_groups() {
        assert_eq!(
            WeatherCondition::from_openweather_id(211),
            WeatherCondition::Thunderstorm
        );
        assert_eq!(WeatherCondition::from_openweather_id(500), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_openweather_id(612), WeatherCondition::Sleet);
        assert_eq!(WeatherCondition::from_openweather_id(741), WeatherCondition::Fog);
        assert_eq!(
            WeatherCondition::from_openweather_id(800),
            WeatherCondition::ClearSky
        );
        assert_eq!(
            WeatherCondition::from_openweather_id(804),
            WeatherCondition::Overcast
        );
    }

    #[test]
    fn openweather_unmapped_ids_are_unknown() {
        for id in [0, 199, 781, 900] {
            assert_eq!(
                WeatherCondition::from_openweather_id(id),
                WeatherCondition::Unknown
            );
        }
    }

    #[test]
    fn text_matches_serde_name() {
        let json = serde_json::to_string(&WeatherCondition::PartlyCloudy).expect("serialize");
        assert_eq!(json, "\"partly_cloudy\"");
        assert_eq!(WeatherCondition::Unknown.to_string(), "unknown");
    }
}
