//! Application-level errors

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Weather provider could not be fetched
    #[error("Fetch failed after {attempts} attempt(s): {message}")]
    Fetch {
        /// Last error reported by the source
        message: String,
        /// Attempts made before giving up
        attempts: u32,
        /// Whether the final error was transient
        retryable: bool,
    },

    /// Reading could not be handed to the broker
    #[error("Publish failed: {0}")]
    Publish(String),

    /// Shutdown was requested while the operation was in flight
    #[error("Operation cancelled by shutdown")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch { retryable: true, .. } | Self::Publish(_))
    }

    /// Whether the error stems from a shutdown request
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
