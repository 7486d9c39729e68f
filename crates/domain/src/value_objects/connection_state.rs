//! Broker connection lifecycle state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the broker connection
///
/// Owned and mutated only by the connection manager; everything else
/// observes it through snapshots for health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No live connection
    #[default]
    Disconnected,
    /// A connect attempt is in progress
    Connecting,
    /// Connection, channel and topology are usable
    Ready,
    /// Last liveness check failed or the broker closed the connection; reconnect on next use
    Degraded,
}

impl ConnectionState {
    /// Whether publishes can go out without reconnecting first
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Stable lowercase name used in logs and health output
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Degraded => "degraded",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
