//! Value Objects - Immutable, identity-less domain primitives

mod connection_state;
mod location;
mod publish_outcome;
mod weather_condition;
mod weather_provider;

pub use connection_state::ConnectionState;
pub use location::{InvalidLocation, Location};
pub use publish_outcome::PublishOutcome;
pub use weather_condition::WeatherCondition;
pub use weather_provider::WeatherProvider;
