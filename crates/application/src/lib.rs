//! Application layer - Use cases and orchestration
//!
//! Defines the ports the collection cycle drives (weather source, reading
//! publisher) and the service that runs one fetch, normalize and publish
//! cycle per location while containing every failure.

pub mod error;
pub mod ports;
pub mod services;

pub use error::ApplicationError;
pub use ports::*;
pub use services::*;
