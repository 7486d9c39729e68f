//! Weather source port
//!
//! Defines the interface for retrieving raw provider payloads.

use async_trait::async_trait;
use domain::value_objects::{Location, WeatherProvider};
#[cfg(test)]
use mockall::automock;
use serde_json::Value;

use crate::error::ApplicationError;

/// Port for fetching raw weather data
///
/// Implementations own timeouts and transient-failure retries; an error
/// returned here is final for the current cycle.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WeatherSourcePort: Send + Sync {
    /// Fetch the decoded JSON body for a location
    async fn fetch(&self, location: &Location) -> Result<Value, ApplicationError>;

    /// Provider the payloads come from
    fn provider(&self) -> WeatherProvider;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_object_safe(_: &dyn WeatherSourcePort) {}

    #[test]
    fn trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn WeatherSourcePort>();
    }
}
