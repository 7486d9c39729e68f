//! Weather provider integration
//!
//! HTTP client for the Open-Meteo (<https://open-meteo.com>, keyless) and
//! OpenWeather (<https://openweathermap.org>, API key) current-weather
//! endpoints. One call is one HTTP GET; retrying is left to the caller, which
//! uses the error classification exposed by [`FetchError`].

pub mod client;
mod error;

pub use client::{WeatherClientConfig, WeatherHttpClient, default_base_url};
pub use error::{FetchError, FetchErrorKind};
