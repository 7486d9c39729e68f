//! Port definitions for application layer
//!
//! Ports are interfaces that define how the collection cycle interacts with
//! the weather provider, the broker and the wall clock. Adapters in the
//! infrastructure layer implement these ports.

mod clock_port;
mod reading_publisher_port;
mod weather_source_port;

#[cfg(test)]
pub use clock_port::MockClockPort;
pub use clock_port::{ClockPort, UtcClock};
#[cfg(test)]
pub use reading_publisher_port::MockReadingPublisherPort;
pub use reading_publisher_port::ReadingPublisherPort;
#[cfg(test)]
pub use weather_source_port::MockWeatherSourcePort;
pub use weather_source_port::WeatherSourcePort;
