//! At-least-once envelope publisher

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use domain::entities::PublishEnvelope;
use domain::value_objects::{ConnectionState, PublishOutcome};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::connection::ConnectionManager;
use crate::error::{AmqpError, ConnectError};
use crate::transport::{BrokerSession, OutboundMessage};

/// Publishes envelopes through a shared [`ConnectionManager`]
///
/// Publishes are serialized: the underlying channel is not safe for
/// concurrent use.
#[derive(Debug)]
pub struct Publisher {
    manager: Arc<ConnectionManager>,
    publish_timeout: Duration,
    shutdown: CancellationToken,
    gate: Mutex<()>,
}

impl Publisher {
    pub fn new(
        manager: Arc<ConnectionManager>,
        publish_timeout: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            manager,
            publish_timeout,
            shutdown,
            gate: Mutex::new(()),
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Publish one envelope
    ///
    /// On a broker-level failure the connection is forced back to
    /// `Disconnected`, re-established, and the envelope republished exactly
    /// once with `delivery_attempt + 1`. Shutdown while waiting for the
    /// broker yields [`PublishOutcome::Cancelled`], never `Dropped`.
    #[instrument(
        skip(self, envelope),
        fields(
            location = %envelope.payload().location.name(),
            collected_at = %envelope.payload().collected_at,
        )
    )]
    pub async fn publish(&self, envelope: PublishEnvelope) -> PublishOutcome {
        let _gate = self.gate.lock().await;
        let message_id = Uuid::new_v4().to_string();

        let session = match self.ready_session().await {
            Ok(session) => session,
            Err(outcome) => return outcome,
        };
        let first = match self.send(&session, &envelope, &message_id).await {
            Ok(()) => {
                debug!(attempt = envelope.delivery_attempt(), "Publish confirmed");
                return PublishOutcome::Delivered;
            },
            Err(AmqpError::Encode(e)) => {
                error!(error = %e, "Envelope could not be encoded");
                return PublishOutcome::Dropped;
            },
            Err(e) => e,
        };

        warn!(
            attempt = envelope.delivery_attempt(),
            error = %first,
            "Publish failed, reconnecting to republish"
        );
        self.manager.force_disconnect().await;

        let retry = envelope.next_attempt(Utc::now());
        let session = match self.ready_session().await {
            Ok(session) => session,
            Err(outcome) => return outcome,
        };
        match self.send(&session, &retry, &message_id).await {
            Ok(()) => {
                info!(attempt = retry.delivery_attempt(), "Republish confirmed");
                PublishOutcome::Delivered
            },
            Err(e) => {
                warn!(attempt = retry.delivery_attempt(), error = %e, "Republish failed");
                if !matches!(e, AmqpError::Encode(_)) {
                    self.manager.mark_degraded();
                }
                PublishOutcome::Dropped
            },
        }
    }

    async fn ready_session(&self) -> Result<Arc<dyn BrokerSession>, PublishOutcome> {
        self.manager
            .ensure_ready(&self.shutdown)
            .await
            .map_err(|e| match e {
                ConnectError::Cancelled => {
                    debug!("Publish interrupted by shutdown");
                    PublishOutcome::Cancelled
                },
                e => {
                    warn!(error = %e, "Broker not ready");
                    PublishOutcome::Dropped
                },
            })
    }

    async fn send(
        &self,
        session: &Arc<dyn BrokerSession>,
        envelope: &PublishEnvelope,
        message_id: &str,
    ) -> Result<(), AmqpError> {
        let body = envelope
            .to_json()
            .map_err(|e| AmqpError::Encode(e.to_string()))?;
        let message = OutboundMessage {
            body,
            message_id: message_id.to_string(),
            timestamp: u64::try_from(envelope.published_at().timestamp()).unwrap_or(0),
        };

        tokio::time::timeout(
            self.publish_timeout,
            session.publish(self.manager.topology(), &message),
        )
        .await
        .map_err(|_| AmqpError::Timeout(self.publish_timeout))?
    }
}
