//! Domain layer for the weather collector
//!
//! Contains the canonical reading types, the broker envelope, and the
//! pure normalizer that turns loosely-typed provider payloads into readings.
//! This layer performs no I/O.

pub mod entities;
pub mod errors;
pub mod normalizer;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use normalizer::{Normalized, normalize, normalize_with_report};
pub use value_objects::*;
