//! lapin-backed AMQP 0-9-1 transport

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use lapin::options::{
    BasicPublishOptions, ConfirmSelectOptions, ExchangeDeclareOptions, QueueBindOptions,
    QueueDeclareOptions,
};
use lapin::publisher_confirm::Confirmation;
use lapin::types::{FieldTable, ShortString};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tracing::debug;

use crate::error::AmqpError;
use crate::transport::{BrokerConnector, BrokerSession, OutboundMessage, Topology};

/// Opens lapin connections to an `amqp://` URL
pub struct LapinConnector {
    url: String,
}

impl LapinConnector {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl fmt::Debug for LapinConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The URL carries credentials
        f.debug_struct("LapinConnector")
            .field("url", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl BrokerConnector for LapinConnector {
    async fn connect(&self) -> Result<Arc<dyn BrokerSession>, AmqpError> {
        let connection = Connection::connect(&self.url, ConnectionProperties::default())
            .await
            .map_err(|e| AmqpError::Connection(e.to_string()))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| AmqpError::Channel(e.to_string()))?;

        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| AmqpError::Channel(e.to_string()))?;

        debug!(channel_id = channel.id(), "AMQP channel open in confirm mode");
        Ok(Arc::new(LapinSession {
            connection,
            channel,
        }))
    }
}

#[derive(Debug)]
struct LapinSession {
    connection: Connection,
    channel: Channel,
}

#[async_trait]
impl BrokerSession for LapinSession {
    async fn declare_topology(&self, topology: &Topology) -> Result<(), AmqpError> {
        self.channel
            .queue_declare(
                &topology.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| AmqpError::Topology(e.to_string()))?;

        if topology.uses_exchange() {
            self.channel
                .exchange_declare(
                    &topology.exchange,
                    ExchangeKind::Direct,
                    ExchangeDeclareOptions {
                        durable: true,
                        ..ExchangeDeclareOptions::default()
                    },
                    FieldTable::default(),
                )
                .await
                .map_err(|e| AmqpError::Topology(e.to_string()))?;

            self.channel
                .queue_bind(
                    &topology.queue,
                    &topology.exchange,
                    &topology.routing_key,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await
                .map_err(|e| AmqpError::Topology(e.to_string()))?;
        }
        Ok(())
    }

    async fn publish(
        &self,
        topology: &Topology,
        message: &OutboundMessage,
    ) -> Result<(), AmqpError> {
        let properties = BasicProperties::default()
            .with_delivery_mode(OutboundMessage::PERSISTENT)
            .with_content_type(ShortString::from(OutboundMessage::CONTENT_TYPE))
            .with_message_id(ShortString::from(message.message_id.clone()))
            .with_timestamp(message.timestamp);

        let confirm = self
            .channel
            .basic_publish(
                &topology.exchange,
                &topology.routing_key,
                BasicPublishOptions {
                    mandatory: true,
                    ..BasicPublishOptions::default()
                },
                &message.body,
                properties,
            )
            .await
            .map_err(|e| AmqpError::Publish(e.to_string()))?;

        match confirm
            .await
            .map_err(|e| AmqpError::Publish(e.to_string()))?
        {
            Confirmation::Ack(None) | Confirmation::NotRequested => Ok(()),
            Confirmation::Ack(Some(_)) => Err(AmqpError::Publish(
                "message returned as unroutable".to_string(),
            )),
            Confirmation::Nack(_) => Err(AmqpError::Nacked),
        }
    }

    fn is_open(&self) -> bool {
        self.connection.status().connected() && self.channel.status().connected()
    }

    async fn close(&self) {
        if let Err(e) = self.channel.close(200, "closing").await {
            debug!(error = %e, "Channel close failed");
        }
        if let Err(e) = self.connection.close(200, "closing").await {
            debug!(error = %e, "Connection close failed");
        }
    }
}
