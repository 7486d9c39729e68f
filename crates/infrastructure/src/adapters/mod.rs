//! Infrastructure adapters
//!
//! Adapters connect application ports to concrete implementations.

mod clock_adapter;
mod queue_publisher_adapter;
mod weather_source_adapter;

pub use clock_adapter::ClockAdapter;
pub use queue_publisher_adapter::QueuePublisherAdapter;
pub use weather_source_adapter::WeatherSourceAdapter;
