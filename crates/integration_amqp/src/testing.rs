//! In-memory broker for tests
//!
//! Implements [`BrokerConnector`] with scriptable faults: rejected connects,
//! publishes that break the channel, and nacks. Queues, exchanges and
//! bindings follow AMQP declare semantics closely enough to check idempotent
//! topology and routing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use domain::entities::PublishEnvelope;
use parking_lot::Mutex;

use crate::error::AmqpError;
use crate::transport::{BrokerConnector, BrokerSession, OutboundMessage, Topology};

/// A message accepted by the in-memory broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub body: Vec<u8>,
    pub message_id: String,
    pub timestamp: u64,
    pub persistent: bool,
}

impl StoredMessage {
    /// Decode the body as an envelope
    ///
    /// # Panics
    ///
    /// Panics if the body is not a valid envelope.
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn envelope(&self) -> PublishEnvelope {
        serde_json::from_slice(&self.body).expect("stored message is an envelope")
    }
}

#[derive(Debug, Default)]
struct Queue {
    durable: bool,
    messages: Vec<StoredMessage>,
}

#[derive(Debug, Default)]
struct BrokerState {
    reject_connects: u32,
    fail_publishes: u32,
    nack_publishes: u32,
    connect_attempts: u32,
    declare_calls: u32,
    generation: u64,
    queues: HashMap<String, Queue>,
    exchanges: HashSet<String>,
    bindings: HashSet<(String, String, String)>,
}

/// Shared handle to an in-memory broker
#[derive(Debug, Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl InMemoryBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the next `n` connection attempts
    pub fn reject_next_connects(&self, n: u32) {
        self.state.lock().reject_connects = n;
    }

    /// Fail the next `n` publishes and close the channel they ran on
    pub fn fail_next_publishes(&self, n: u32) {
        self.state.lock().fail_publishes = n;
    }

    /// Nack the next `n` publishes
    pub fn nack_next_publishes(&self, n: u32) {
        self.state.lock().nack_publishes = n;
    }

    /// Close every open session, as a broker restart would
    pub fn drop_connections(&self) {
        self.state.lock().generation += 1;
    }

    pub fn connect_attempts(&self) -> u32 {
        self.state.lock().connect_attempts
    }

    pub fn declare_calls(&self) -> u32 {
        self.state.lock().declare_calls
    }

    pub fn queue_count(&self) -> usize {
        self.state.lock().queues.len()
    }

    pub fn exchange_count(&self) -> usize {
        self.state.lock().exchanges.len()
    }

    pub fn is_durable(&self, queue: &str) -> bool {
        self.state.lock().queues.get(queue).is_some_and(|q| q.durable)
    }

    /// Messages currently on `queue`
    pub fn messages(&self, queue: &str) -> Vec<StoredMessage> {
        self.state
            .lock()
            .queues
            .get(queue)
            .map(|q| q.messages.clone())
            .unwrap_or_default()
    }

    /// Decoded envelopes currently on `queue`
    pub fn envelopes(&self, queue: &str) -> Vec<PublishEnvelope> {
        self.messages(queue).iter().map(StoredMessage::envelope).collect()
    }
}

#[async_trait]
impl BrokerConnector for InMemoryBroker {
    async fn connect(&self) -> Result<Arc<dyn BrokerSession>, AmqpError> {
        let mut state = self.state.lock();
        state.connect_attempts += 1;
        if state.reject_connects > 0 {
            state.reject_connects -= 1;
            return Err(AmqpError::Connection("connection refused".to_string()));
        }
        Ok(Arc::new(InMemorySession {
            broker: self.clone(),
            generation: state.generation,
            closed: AtomicBool::new(false),
        }))
    }
}

#[derive(Debug)]
struct InMemorySession {
    broker: InMemoryBroker,
    generation: u64,
    closed: AtomicBool,
}

impl InMemorySession {
    fn check_open(&self) -> Result<(), AmqpError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(AmqpError::Channel("channel closed".to_string()))
        }
    }
}

#[async_trait]
impl BrokerSession for InMemorySession {
    async fn declare_topology(&self, topology: &Topology) -> Result<(), AmqpError> {
        self.check_open()?;
        let mut state = self.broker.state.lock();
        state.declare_calls += 1;

        let queue = state.queues.entry(topology.queue.clone()).or_insert(Queue {
            durable: true,
            messages: Vec::new(),
        });
        if !queue.durable {
            return Err(AmqpError::Topology(format!(
                "PRECONDITION_FAILED - inequivalent arg 'durable' for queue '{}'",
                topology.queue
            )));
        }

        if topology.uses_exchange() {
            state.exchanges.insert(topology.exchange.clone());
            state.bindings.insert((
                topology.exchange.clone(),
                topology.routing_key.clone(),
                topology.queue.clone(),
            ));
        }
        Ok(())
    }

    async fn publish(
        &self,
        topology: &Topology,
        message: &OutboundMessage,
    ) -> Result<(), AmqpError> {
        self.check_open()?;
        let mut state = self.broker.state.lock();

        if state.fail_publishes > 0 {
            state.fail_publishes -= 1;
            self.closed.store(true, Ordering::Release);
            return Err(AmqpError::Publish("channel closed mid-flight".to_string()));
        }
        if state.nack_publishes > 0 {
            state.nack_publishes -= 1;
            return Err(AmqpError::Nacked);
        }

        let targets: Vec<String> = if topology.uses_exchange() {
            state
                .bindings
                .iter()
                .filter(|(ex, key, _)| *ex == topology.exchange && *key == topology.routing_key)
                .map(|(_, _, queue)| queue.clone())
                .collect()
        } else {
            vec![topology.routing_key.clone()]
        };

        let stored = StoredMessage {
            body: message.body.clone(),
            message_id: message.message_id.clone(),
            timestamp: message.timestamp,
            persistent: true,
        };
        let mut routed = false;
        for name in targets {
            if let Some(queue) = state.queues.get_mut(&name) {
                queue.messages.push(stored.clone());
                routed = true;
            }
        }
        if routed {
            Ok(())
        } else {
            Err(AmqpError::Publish("message returned as unroutable".to_string()))
        }
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
            && self.broker.state.lock().generation == self.generation
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
