//! Weather provider HTTP client
//!
//! Performs exactly one GET per call with a fixed connect and read timeout
//! and classifies the outcome. Query parameters follow each provider's
//! current-conditions contract.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use domain::value_objects::{Location, WeatherProvider};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::FetchError;

/// Fields requested from Open-Meteo for both `current` and `hourly`
const OPEN_METEO_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,wind_speed_10m,precipitation,weather_code";

/// Default endpoint for a provider
#[must_use]
pub const fn default_base_url(provider: WeatherProvider) -> &'static str {
    match provider {
        WeatherProvider::OpenMeteo => "https://api.open-meteo.com/v1/forecast",
        WeatherProvider::OpenWeather => "https://api.openweathermap.org/data/2.5/weather",
    }
}

/// Weather client configuration
#[derive(Clone)]
pub struct WeatherClientConfig {
    /// Provider contract to speak
    pub provider: WeatherProvider,
    /// Full endpoint URL, query parameters are appended
    pub base_url: String,
    /// API key, required by OpenWeather
    pub api_key: Option<String>,
    /// Connect plus read timeout for one request
    pub timeout: Duration,
}

impl WeatherClientConfig {
    /// Configuration with the provider's public endpoint and a 10s timeout
    #[must_use]
    pub fn for_provider(provider: WeatherProvider) -> Self {
        Self {
            provider,
            base_url: default_base_url(provider).to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl Default for WeatherClientConfig {
    fn default() -> Self {
        Self::for_provider(WeatherProvider::OpenMeteo)
    }
}

impl fmt::Debug for WeatherClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherClientConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// HTTP client for one weather provider
#[derive(Debug, Clone)]
pub struct WeatherHttpClient {
    client: Client,
    config: WeatherClientConfig,
}

impl WeatherHttpClient {
    /// Create a new client with the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: WeatherClientConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::network(e.to_string(), false))?;

        Ok(Self { client, config })
    }

    #[must_use]
    pub const fn provider(&self) -> WeatherProvider {
        self.config.provider
    }

    /// Query parameters for a location
    fn query(&self, location: &Location) -> Vec<(&'static str, String)> {
        let lat = location.latitude().to_string();
        let lon = location.longitude().to_string();
        match self.config.provider {
            WeatherProvider::OpenMeteo => vec![
                ("latitude", lat),
                ("longitude", lon),
                ("current", OPEN_METEO_FIELDS.to_string()),
                ("hourly", OPEN_METEO_FIELDS.to_string()),
                ("timezone", "GMT".to_string()),
                ("wind_speed_unit", "kmh".to_string()),
            ],
            WeatherProvider::OpenWeather => vec![
                ("lat", lat),
                ("lon", lon),
                ("appid", self.config.api_key.clone().unwrap_or_default()),
                ("units", "metric".to_string()),
            ],
        }
    }

    /// Fetch the current-conditions payload for a location
    ///
    /// # Errors
    ///
    /// Returns a classified [`FetchError`]; see [`FetchError::is_retryable`].
    #[instrument(skip(self), fields(provider = %self.config.provider, location = %location.name()))]
    pub async fn fetch(&self, location: &Location) -> Result<Value, FetchError> {
        debug_assert!((-90.0..=90.0).contains(&location.latitude()));
        debug_assert!((-180.0..=180.0).contains(&location.longitude()));

        debug!("Fetching current weather");

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&self.query(location))
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(&response, Utc::now());
            return Err(FetchError::http_status(status.as_u16(), retry_after));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let value: Value =
            serde_json::from_slice(&body).map_err(|e| FetchError::decode(e.to_string()))?;

        debug!(bytes = body.len(), "Weather payload received");
        Ok(value)
    }
}

fn classify_transport_error(e: &reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::timeout(e.to_string())
    } else if e.is_builder() {
        FetchError::network(e.to_string(), false)
    } else {
        FetchError::network(e.to_string(), true)
    }
}

/// Read `Retry-After` as delta seconds or as an HTTP date
fn parse_retry_after(response: &Response, now: DateTime<Utc>) -> Option<Duration> {
    let value = response.headers().get(RETRY_AFTER)?.to_str().ok()?;
    retry_after_from_str(value, now)
}

fn retry_after_from_str(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    (at - now).to_std().ok().or(Some(Duration::ZERO))
}
