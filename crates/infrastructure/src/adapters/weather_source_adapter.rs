//! Weather source adapter - Implements WeatherSourcePort using integration_weather

use application::error::ApplicationError;
use application::ports::WeatherSourcePort;
use async_trait::async_trait;
use domain::value_objects::{Location, WeatherProvider};
use integration_weather::{WeatherClientConfig, WeatherHttpClient};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::retry::{RetryConfig, Retryable, with_retry};

/// Fetches provider payloads with bounded retry on transient failures
#[derive(Debug, Clone)]
pub struct WeatherSourceAdapter {
    client: WeatherHttpClient,
    retry: RetryConfig,
    shutdown: CancellationToken,
}

impl WeatherSourceAdapter {
    /// Create an adapter for one provider
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to initialize.
    pub fn new(
        config: WeatherClientConfig,
        retry: RetryConfig,
        shutdown: CancellationToken,
    ) -> Result<Self, ApplicationError> {
        let client = WeatherHttpClient::new(config)
            .map_err(|e| ApplicationError::Configuration(e.to_string()))?;
        Ok(Self {
            client,
            retry,
            shutdown,
        })
    }
}

#[async_trait]
impl WeatherSourcePort for WeatherSourceAdapter {
    #[instrument(skip(self, location), fields(location = %location.name()))]
    async fn fetch(&self, location: &Location) -> Result<Value, ApplicationError> {
        let outcome = with_retry(&self.retry, &self.shutdown, || self.client.fetch(location)).await;
        let attempts = outcome.attempts;

        if outcome.cancelled {
            return Err(ApplicationError::Cancelled);
        }
        match outcome.into_result() {
            Ok(body) => {
                debug!(attempts, "Fetch succeeded");
                Ok(body)
            },
            Err(e) => Err(ApplicationError::Fetch {
                retryable: e.is_retryable(),
                message: e.to_string(),
                attempts,
            }),
        }
    }

    fn provider(&self) -> WeatherProvider {
        self.client.provider()
    }
}
