//! Domain entities - Readings and the envelopes that carry them

mod publish_envelope;
mod weather_reading;

pub use publish_envelope::{PublishEnvelope, SCHEMA_VERSION};
pub use weather_reading::WeatherReading;
