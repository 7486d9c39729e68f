//! Queue publisher adapter - Implements ReadingPublisherPort using integration_amqp

use std::sync::Arc;

use application::ports::ReadingPublisherPort;
use async_trait::async_trait;
use domain::entities::PublishEnvelope;
use domain::value_objects::{ConnectionState, PublishOutcome};
use integration_amqp::{ConnectionManager, Publisher};

/// Hands envelopes to the broker through a shared [`Publisher`]
#[derive(Debug, Clone)]
pub struct QueuePublisherAdapter {
    publisher: Arc<Publisher>,
}

impl QueuePublisherAdapter {
    #[must_use]
    pub const fn new(publisher: Arc<Publisher>) -> Self {
        Self { publisher }
    }

    /// Connection manager behind the publisher, for shutdown
    #[must_use]
    pub fn manager(&self) -> &Arc<ConnectionManager> {
        self.publisher.manager()
    }
}

#[async_trait]
impl ReadingPublisherPort for QueuePublisherAdapter {
    async fn publish(&self, envelope: PublishEnvelope) -> PublishOutcome {
        self.publisher.publish(envelope).await
    }

    fn connection_state(&self) -> ConnectionState {
        self.publisher.connection_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::entities::WeatherReading;
    use domain::value_objects::{Location, WeatherProvider};
    use integration_amqp::testing::InMemoryBroker;
    use integration_amqp::{ReconnectConfig, Topology};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn publishes_through_port() {
        let broker = InMemoryBroker::new();
        let manager = ConnectionManager::new(
            Arc::new(broker.clone()),
            Topology::queue("readings"),
            ReconnectConfig::default(),
        );
        let publisher = Publisher::new(
            Arc::new(manager),
            Duration::from_secs(5),
            CancellationToken::new(),
        );
        let port: Arc<dyn ReadingPublisherPort> =
            Arc::new(QueuePublisherAdapter::new(Arc::new(publisher)));
        assert_eq!(port.connection_state(), ConnectionState::Disconnected);

        let location = Location::new("Oslo", 59.91, 10.75).unwrap();
        let reading = WeatherReading::empty(location, Utc::now());
        let envelope = PublishEnvelope::first(reading, WeatherProvider::OpenMeteo, Utc::now());

        assert_eq!(port.publish(envelope).await, PublishOutcome::Delivered);
        assert_eq!(port.connection_state(), ConnectionState::Ready);
        assert_eq!(broker.messages("readings").len(), 1);
    }
}
