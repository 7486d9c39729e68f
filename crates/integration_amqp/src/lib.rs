//! AMQP broker integration
//!
//! Owns the broker connection lifecycle and durable publication of reading
//! envelopes:
//!
//! - [`ConnectionManager`] drives the `Disconnected -> Connecting -> Ready`
//!   state machine, reconnecting with exponential backoff and declaring the
//!   durable topology on every fresh connection.
//! - [`Publisher`] publishes persistent messages with at-least-once semantics,
//!   forcing one reconnect and republish on a broker-level failure.
//!
//! The transport is abstracted behind [`BrokerConnector`] so the state machine
//! runs unchanged against lapin or the in-memory broker in [`testing`].

mod connection;
mod error;
mod lapin_transport;
mod publisher;
mod reconnect;
mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use connection::{ConnectionManager, DEFAULT_CONNECT_TIMEOUT};
pub use error::{AmqpError, ConnectError};
pub use lapin_transport::LapinConnector;
pub use publisher::Publisher;
pub use reconnect::ReconnectConfig;
pub use transport::{BrokerConnector, BrokerSession, OutboundMessage, Topology};
