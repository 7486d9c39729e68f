//! Weather provider settings

use std::time::Duration;

use domain::value_objects::WeatherProvider;
use integration_weather::{WeatherClientConfig, default_base_url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::retry::RetryConfig;

/// Weather provider configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider contract (`open_meteo` or `open_weather`)
    #[serde(default)]
    pub kind: WeatherProvider,

    /// Endpoint override; the provider's public endpoint when unset
    #[serde(default)]
    pub base_url: Option<String>,

    /// API key, required by OpenWeather (sensitive - uses `SecretString`)
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// Connect and read timeout for one request (default: 10)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Backoff for transient fetch failures
    #[serde(default)]
    pub retry: RetryConfig,
}

const fn default_timeout() -> u64 {
    10
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: WeatherProvider::default(),
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ProviderConfig {
    /// Effective endpoint
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| default_base_url(self.kind))
    }

    /// Whether a non-blank API key is configured
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|key| !key.expose_secret().trim().is_empty())
    }

    /// Settings for the HTTP client
    #[must_use]
    pub fn client_config(&self) -> WeatherClientConfig {
        WeatherClientConfig {
            provider: self.kind,
            base_url: self.base_url().to_string(),
            api_key: self
                .api_key
                .as_ref()
                .map(|key| key.expose_secret().to_string()),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}
