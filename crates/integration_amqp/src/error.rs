//! Broker error types

use std::time::Duration;

use thiserror::Error;

/// Transport-level broker errors
#[derive(Debug, Clone, Error)]
pub enum AmqpError {
    /// Could not open the transport connection
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Connect and declare did not finish in time
    #[error("Connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Could not open or configure the channel
    #[error("Channel error: {0}")]
    Channel(String),

    /// Queue, exchange or binding declaration was rejected
    #[error("Topology declaration failed: {0}")]
    Topology(String),

    /// Publish failed in flight
    #[error("Publish failed: {0}")]
    Publish(String),

    /// Broker negatively acknowledged the message
    #[error("Broker rejected the message (nack)")]
    Nacked,

    /// No confirm arrived in time
    #[error("Publish confirm timed out after {0:?}")]
    Timeout(Duration),

    /// Envelope could not be encoded
    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// Why [`crate::ConnectionManager::ensure_ready`] gave up
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectError {
    /// Shutdown was requested while waiting to reconnect
    #[error("Shutdown requested while connecting to broker")]
    Cancelled,

    /// Connect budget or retry limit was used up
    #[error("Broker unreachable after {attempts} attempt(s): {last_error}")]
    BudgetExhausted {
        /// Connection attempts made
        attempts: u32,
        /// Error from the final attempt
        last_error: String,
    },

    /// The manager was closed and will not reconnect
    #[error("Connection manager is closed")]
    Closed,
}
