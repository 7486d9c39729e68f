//! Reading publisher port
//!
//! Defines the interface for handing envelopes to the message broker.

use async_trait::async_trait;
use domain::entities::PublishEnvelope;
use domain::value_objects::{ConnectionState, PublishOutcome};
#[cfg(test)]
use mockall::automock;

/// Port for durable publication of readings
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReadingPublisherPort: Send + Sync {
    /// Publish one envelope
    ///
    /// `Dropped` means the connect and republish attempts were exhausted
    /// for this cycle; `Cancelled` means shutdown cut them short.
    async fn publish(&self, envelope: PublishEnvelope) -> PublishOutcome;

    /// Current broker connection state, for health reporting
    fn connection_state(&self) -> ConnectionState;
}
