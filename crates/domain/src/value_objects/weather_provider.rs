//! Weather data provider identifier

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upstream weather API a reading was collected from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherProvider {
    /// Open-Meteo forecast API (no API key)
    #[default]
    OpenMeteo,
    /// OpenWeather current weather API (requires API key)
    OpenWeather,
}

impl WeatherProvider {
    /// Stable identifier used on the wire and in configuration
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenMeteo => "open_meteo",
            Self::OpenWeather => "open_weather",
        }
    }

    /// Whether requests must carry an API key
    #[must_use]
    pub const fn requires_api_key(self) -> bool {
        matches!(self, Self::OpenWeather)
    }
}

impl fmt::Display for WeatherProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeatherProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "open_meteo" | "openmeteo" => Ok(Self::OpenMeteo),
            "open_weather" | "openweather" => Ok(Self::OpenWeather),
            _ => Err(format!(
                "Invalid provider: {s}. Use 'open_meteo' or 'open_weather'"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_spellings() {
        assert_eq!("open-meteo".parse::<WeatherProvider>(), Ok(WeatherProvider::OpenMeteo));
        assert_eq!("OpenWeather".parse::<WeatherProvider>(), Ok(WeatherProvider::OpenWeather));
        assert!("darksky".parse::<WeatherProvider>().is_err());
    }

    #[test]
    fn only_open_weather_needs_key() {
        assert!(WeatherProvider::OpenWeather.requires_api_key());
        assert!(!WeatherProvider::OpenMeteo.requires_api_key());
    }

    #[test]
    fn wire_name_matches_serde() {
        for provider in [WeatherProvider::OpenMeteo, WeatherProvider::OpenWeather] {
            let json = serde_json::to_string(&provider).expect("serialize");
            assert_eq!(json, format!("\"{}\"", provider.as_str()));
        }
    }
}
