//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
#[derive(Debug, Error)]
pub enum DomainError {
    /// A location failed validation
    #[error(transparent)]
    InvalidLocation(#[from] crate::value_objects::InvalidLocation),

    /// Envelope could not be encoded for the wire
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
