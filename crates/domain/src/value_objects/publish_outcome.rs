//! Result of handing one envelope to the broker

use std::fmt;

/// What became of a publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublishOutcome {
    /// The broker confirmed the message
    Delivered,
    /// Connect and republish attempts were exhausted; the reading is lost
    Dropped,
    /// Shutdown interrupted the publish before the broker accepted it
    Cancelled,
}

impl PublishOutcome {
    #[must_use]
    pub const fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Dropped => "dropped",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
