//! Broker transport abstraction
//!
//! A [`BrokerConnector`] opens one [`BrokerSession`]: a transport connection
//! with a single channel in publisher-confirm mode.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AmqpError;

/// Queue and exchange layout messages are routed through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    /// Durable queue readings land on
    pub queue: String,
    /// Direct exchange; empty means the default exchange
    pub exchange: String,
    /// Routing key; the queue name when routing via the default exchange
    pub routing_key: String,
}

impl Topology {
    /// Route through the default exchange straight to `queue`
    #[must_use]
    pub fn queue(queue: impl Into<String>) -> Self {
        let queue = queue.into();
        Self {
            routing_key: queue.clone(),
            queue,
            exchange: String::new(),
        }
    }

    /// Route through a named direct exchange bound to `queue`
    #[must_use]
    pub fn with_exchange(mut self, exchange: impl Into<String>, routing_key: impl Into<String>) -> Self {
        self.exchange = exchange.into();
        self.routing_key = routing_key.into();
        self
    }

    /// Whether a named exchange must be declared and bound
    #[must_use]
    pub fn uses_exchange(&self) -> bool {
        !self.exchange.is_empty()
    }
}

/// A message ready for the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// UTF-8 JSON body
    pub body: Vec<u8>,
    /// Stable across republishes of the same reading
    pub message_id: String,
    /// Unix seconds
    pub timestamp: u64,
}

impl OutboundMessage {
    pub const CONTENT_TYPE: &'static str = "application/json";

    /// AMQP delivery mode for persistent messages
    pub const PERSISTENT: u8 = 2;
}

/// Opens broker sessions
#[async_trait]
pub trait BrokerConnector: Send + Sync + fmt::Debug {
    /// Open a connection and a confirm-mode channel
    async fn connect(&self) -> Result<Arc<dyn BrokerSession>, AmqpError>;
}

/// One open connection and channel
#[async_trait]
pub trait BrokerSession: Send + Sync + fmt::Debug {
    /// Declare the durable queue, and exchange plus binding if configured
    ///
    /// Declaring an existing matching topology is a no-op on the broker.
    async fn declare_topology(&self, topology: &Topology) -> Result<(), AmqpError>;

    /// Publish a persistent message and wait for the broker confirm
    async fn publish(&self, topology: &Topology, message: &OutboundMessage)
    -> Result<(), AmqpError>;

    /// Liveness check: connection and channel are both still open
    fn is_open(&self) -> bool;

    /// Close channel and connection, ignoring errors
    async fn close(&self);
}
