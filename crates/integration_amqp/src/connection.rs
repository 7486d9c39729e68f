//! Broker connection lifecycle
//!
//! [`ConnectionManager`] is the sole owner of the broker session and of the
//! [`ConnectionState`]. Transitions:
//!
//! ```text
//! Disconnected --connect ok-----------------> Ready
//! Disconnected --connect failed (backoff)---> Disconnected
//! Ready --check failed / close observed-----> Degraded
//! Degraded --ensure_ready-------------------> Disconnected (then reconnect)
//! any --close-------------------------------> Disconnected (terminal)
//! ```
//!
//! `Connecting` is reported while a connect attempt is in flight. A close
//! observed on the held session is reported as `Degraded` as soon as the
//! state is read.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use domain::value_objects::ConnectionState;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{AmqpError, ConnectError};
use crate::reconnect::ReconnectConfig;
use crate::transport::{BrokerConnector, BrokerSession, Topology};

/// Default bound on a single connect and declare attempt
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the broker connection and its state machine
pub struct ConnectionManager {
    connector: Arc<dyn BrokerConnector>,
    topology: Topology,
    reconnect: ReconnectConfig,
    connect_budget: Option<Duration>,
    connect_timeout: Duration,
    session: Mutex<Option<Arc<dyn BrokerSession>>>,
    /// Read-only view of the held session for state observation
    current: RwLock<Option<Arc<dyn BrokerSession>>>,
    state: RwLock<ConnectionState>,
    closed: AtomicBool,
    consecutive_failures: AtomicU32,
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connector", &self.connector)
            .field("topology", &self.topology)
            .field("state", &self.state())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Create a manager; no connection is opened until [`Self::ensure_ready`]
    pub fn new(
        connector: Arc<dyn BrokerConnector>,
        topology: Topology,
        reconnect: ReconnectConfig,
    ) -> Self {
        Self {
            connector,
            topology,
            reconnect,
            connect_budget: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            session: Mutex::new(None),
            current: RwLock::new(None),
            state: RwLock::new(ConnectionState::Disconnected),
            closed: AtomicBool::new(false),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    /// Bound the time one [`Self::ensure_ready`] call may spend reconnecting
    #[must_use]
    pub const fn with_connect_budget(mut self, budget: Duration) -> Self {
        self.connect_budget = Some(budget);
        self
    }

    /// Bound a single connect and declare attempt
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Current connection state
    ///
    /// A `Ready` connection whose session has been closed by the broker is
    /// moved to `Degraded` here.
    pub fn state(&self) -> ConnectionState {
        let state = *self.state.read();
        if state == ConnectionState::Ready && self.held_session_closed() {
            self.mark_degraded();
            return *self.state.read();
        }
        state
    }

    fn held_session_closed(&self) -> bool {
        self.current
            .read()
            .as_ref()
            .is_some_and(|session| !session.is_open())
    }

    fn hold(
        &self,
        slot: &mut Option<Arc<dyn BrokerSession>>,
        session: Option<Arc<dyn BrokerSession>>,
    ) {
        self.current.write().clone_from(&session);
        *slot = session;
    }

    pub const fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Failed connect attempts since the last successful connect
    pub fn failure_count(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = std::mem::replace(&mut *self.state.write(), next);
        if previous != next {
            debug!(from = %previous, to = %next, "Broker connection state changed");
        }
    }

    /// Return a ready session, reconnecting if needed
    ///
    /// Retries with exponential backoff until connected, the shutdown token
    /// fires, or the connect budget (if any) would be exceeded by the next
    /// sleep. Each attempt is cut off after the connect timeout, clamped to
    /// what is left of the budget.
    #[instrument(skip(self, cancel), fields(queue = %self.topology.queue))]
    pub async fn ensure_ready(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Arc<dyn BrokerSession>, ConnectError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ConnectError::Closed);
        }

        let mut slot = self.session.lock().await;

        if let Some(session) = slot.as_ref() {
            if self.state() == ConnectionState::Ready {
                return Ok(Arc::clone(session));
            }
        }

        if self.state() == ConnectionState::Degraded {
            if let Some(stale) = slot.take() {
                stale.close().await;
            }
            self.hold(&mut slot, None);
            self.set_state(ConnectionState::Disconnected);
        }

        let started = Instant::now();
        let mut attempt = 0u32;
        loop {
            if self.closed.load(Ordering::Acquire) {
                return Err(ConnectError::Closed);
            }
            if cancel.is_cancelled() {
                return Err(ConnectError::Cancelled);
            }

            let attempt_timeout = match self.connect_budget {
                Some(budget) => self
                    .connect_timeout
                    .min(budget.saturating_sub(started.elapsed())),
                None => self.connect_timeout,
            };

            self.set_state(ConnectionState::Connecting);
            let outcome = tokio::select! {
                () = cancel.cancelled() => {
                    self.set_state(ConnectionState::Disconnected);
                    return Err(ConnectError::Cancelled);
                },
                outcome = tokio::time::timeout(attempt_timeout, self.connect_once()) => outcome,
            };
            let error = match outcome {
                Ok(Ok(session)) => {
                    self.consecutive_failures.store(0, Ordering::Relaxed);
                    self.hold(&mut slot, Some(Arc::clone(&session)));
                    self.set_state(ConnectionState::Ready);
                    info!(attempts = attempt + 1, "Broker connection ready");
                    return Ok(session);
                },
                Ok(Err(e)) => e,
                Err(_) => AmqpError::ConnectTimeout(attempt_timeout),
            };

            self.set_state(ConnectionState::Disconnected);
            self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
            let attempts = attempt + 1;

            if !self.reconnect.should_retry(attempt) {
                warn!(attempts, error = %error, "Broker reconnect retries exhausted");
                return Err(ConnectError::BudgetExhausted {
                    attempts,
                    last_error: error.to_string(),
                });
            }

            let delay = self.reconnect.calculate_delay(attempt);
            if let Some(budget) = self.connect_budget {
                if started.elapsed() + delay > budget {
                    warn!(attempts, ?budget, error = %error, "Broker connect budget exhausted");
                    return Err(ConnectError::BudgetExhausted {
                        attempts,
                        last_error: error.to_string(),
                    });
                }
            }

            #[allow(clippy::cast_possible_truncation)]
            let delay_ms = delay.as_millis() as u64;
            warn!(
                attempt = attempts,
                delay_ms,
                error = %error,
                "Broker connect failed, waiting before retry"
            );

            tokio::select! {
                () = cancel.cancelled() => return Err(ConnectError::Cancelled),
                () = tokio::time::sleep(delay) => {},
            }
            attempt += 1;
        }
    }

    async fn connect_once(&self) -> Result<Arc<dyn BrokerSession>, AmqpError> {
        let session = self.connector.connect().await?;
        if let Err(e) = session.declare_topology(&self.topology).await {
            session.close().await;
            return Err(e);
        }
        Ok(session)
    }

    /// Record an observed broker close or failed liveness check
    ///
    /// Only a `Ready` connection becomes `Degraded`; the next
    /// [`Self::ensure_ready`] reconnects.
    pub fn mark_degraded(&self) {
        let mut state = self.state.write();
        if *state == ConnectionState::Ready {
            *state = ConnectionState::Degraded;
            warn!("Broker connection degraded");
        }
    }

    /// Drop the current session so the next call opens a fresh one
    pub async fn force_disconnect(&self) {
        let stale = {
            let mut slot = self.session.lock().await;
            let stale = slot.take();
            self.hold(&mut slot, None);
            stale
        };
        if let Some(session) = stale {
            session.close().await;
        }
        self.set_state(ConnectionState::Disconnected);
    }

    /// Close the connection; the manager will not reconnect afterwards
    pub async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.force_disconnect().await;
        info!("Broker connection closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryBroker;
    use async_trait::async_trait;

    /// Accepts the TCP connection but never finishes the handshake
    #[derive(Debug, Default)]
    struct HangingConnector {
        attempts: AtomicU32,
    }

    #[async_trait]
    impl BrokerConnector for HangingConnector {
        async fn connect(&self) -> Result<Arc<dyn BrokerSession>, AmqpError> {
            self.attempts.fetch_add(1, Ordering::Relaxed);
            std::future::pending().await
        }
    }

    fn fast_reconnect() -> ReconnectConfig {
        ReconnectConfig {
            initial_delay_ms: 100,
            max_delay_ms: 1000,
            jitter_factor: 0.0,
            ..ReconnectConfig::default()
        }
    }

    fn manager(broker: &InMemoryBroker) -> ConnectionManager {
        ConnectionManager::new(
            Arc::new(broker.clone()),
            Topology::queue("weather_readings"),
            fast_reconnect(),
        )
    }

    #[tokio::test]
    async fn starts_disconnected() {
        let broker = InMemoryBroker::new();
        let manager = manager(&broker);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(broker.connect_attempts(), 0);
    }

    #[tokio::test]
    async fn connect_success_is_ready() {
        let broker = InMemoryBroker::new();
        let manager = manager(&broker);
        let cancel = CancellationToken::new();

        manager.ensure_ready(&cancel).await.expect("connects");
        assert_eq!(manager.state(), ConnectionState::Ready);

        // a healthy session is reused
        manager.ensure_ready(&cancel).await.expect("still ready");
        assert_eq!(broker.connect_attempts(), 1);
    }

    #[tokio::test]
    async fn topology_declaration_is_idempotent() {
        let broker = InMemoryBroker::new();
        let manager = manager(&broker);
        let cancel = CancellationToken::new();

        for _ in 0..5 {
            manager.ensure_ready(&cancel).await.expect("connects");
            manager.force_disconnect().await;
        }

        assert_eq!(broker.declare_calls(), 5);
        assert_eq!(broker.queue_count(), 1);
        assert!(broker.is_durable("weather_readings"));
    }

    #[tokio::test]
    async fn repeated_declares_on_one_session() {
        let broker = InMemoryBroker::new();
        let session = broker.connect().await.expect("connects");
        let topology = Topology::queue("weather_readings").with_exchange("weather", "readings");

        for _ in 0..3 {
            session.declare_topology(&topology).await.expect("declare is a no-op");
        }
        assert_eq!(broker.queue_count(), 1);
        assert_eq!(broker.exchange_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_after_rejected_attempts() {
        let broker = InMemoryBroker::new();
        broker.reject_next_connects(2);
        let manager = manager(&broker);

        let started = Instant::now();
        manager
            .ensure_ready(&CancellationToken::new())
            .await
            .expect("third attempt connects");

        assert_eq!(broker.connect_attempts(), 3);
        assert_eq!(manager.state(), ConnectionState::Ready);
        assert_eq!(manager.failure_count(), 0);
        // 100ms then 200ms backoff
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_connection_is_replaced_on_next_use() {
        let broker = InMemoryBroker::new();
        let manager = manager(&broker);
        let cancel = CancellationToken::new();

        manager.ensure_ready(&cancel).await.expect("connects");
        broker.drop_connections();

        manager.ensure_ready(&cancel).await.expect("reconnects");
        assert_eq!(broker.connect_attempts(), 2);
        assert_eq!(manager.state(), ConnectionState::Ready);
    }

    #[tokio::test]
    async fn broker_close_is_reported_as_degraded() {
        let broker = InMemoryBroker::new();
        let manager = manager(&broker);

        manager
            .ensure_ready(&CancellationToken::new())
            .await
            .expect("connects");
        assert_eq!(manager.state(), ConnectionState::Ready);

        broker.drop_connections();
        assert_eq!(manager.state(), ConnectionState::Degraded);
        assert_eq!(broker.connect_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_connect_is_bounded_by_budget() {
        let connector = Arc::new(HangingConnector::default());
        let manager = ConnectionManager::new(
            Arc::clone(&connector) as Arc<dyn BrokerConnector>,
            Topology::queue("weather_readings"),
            fast_reconnect(),
        )
        .with_connect_budget(Duration::from_secs(120));

        let started = Instant::now();
        let err = tokio::time::timeout(
            Duration::from_secs(3600),
            manager.ensure_ready(&CancellationToken::new()),
        )
        .await
        .expect("returns within the budget")
        .expect_err("never connects");

        assert!(matches!(err, ConnectError::BudgetExhausted { .. }));
        assert!(started.elapsed() <= Duration::from_secs(120));
        assert!(connector.attempts.load(Ordering::Relaxed) > 1);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_connect_times_out_per_attempt() {
        let connector = Arc::new(HangingConnector::default());
        let manager = ConnectionManager::new(
            Arc::clone(&connector) as Arc<dyn BrokerConnector>,
            Topology::queue("weather_readings"),
            ReconnectConfig {
                max_retries: 1,
                ..fast_reconnect()
            },
        )
        .with_connect_timeout(Duration::from_secs(2));

        let err = manager
            .ensure_ready(&CancellationToken::new())
            .await
            .expect_err("gives up");

        assert_eq!(
            err,
            ConnectError::BudgetExhausted {
                attempts: 2,
                last_error: "Connect timed out after 2s".to_string(),
            }
        );
        assert_eq!(connector.attempts.load(Ordering::Relaxed), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_hung_connect() {
        let manager = Arc::new(ConnectionManager::new(
            Arc::new(HangingConnector::default()),
            Topology::queue("weather_readings"),
            fast_reconnect(),
        ));
        let cancel = CancellationToken::new();

        let task = {
            let manager = Arc::clone(&manager);
            let cancel = cancel.clone();
            tokio::spawn(async move { manager.ensure_ready(&cancel).await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(manager.state(), ConnectionState::Connecting);
        cancel.cancel();

        let result = task.await.expect("task joins");
        assert_eq!(result, Err(ConnectError::Cancelled));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn mark_degraded_only_from_ready() {
        let broker = InMemoryBroker::new();
        let manager = manager(&broker);

        manager.mark_degraded();
        assert_eq!(manager.state(), ConnectionState::Disconnected);

        manager
            .ensure_ready(&CancellationToken::new())
            .await
            .expect("connects");
        manager.mark_degraded();
        assert_eq!(manager.state(), ConnectionState::Degraded);

        manager
            .ensure_ready(&CancellationToken::new())
            .await
            .expect("reconnects");
        assert_eq!(manager.state(), ConnectionState::Ready);
        assert_eq!(broker.connect_attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn budget_bounds_one_call() {
        let broker = InMemoryBroker::new();
        broker.reject_next_connects(u32::MAX);
        let manager = manager(&broker).with_connect_budget(Duration::from_secs(5));

        let err = manager
            .ensure_ready(&CancellationToken::new())
            .await
            .expect_err("budget runs out");

        assert!(matches!(err, ConnectError::BudgetExhausted { .. }));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_limit_bounds_attempts() {
        let broker = InMemoryBroker::new();
        broker.reject_next_connects(u32::MAX);
        let manager = ConnectionManager::new(
            Arc::new(broker.clone()),
            Topology::queue("weather_readings"),
            ReconnectConfig {
                max_retries: 2,
                ..fast_reconnect()
            },
        );

        let err = manager
            .ensure_ready(&CancellationToken::new())
            .await
            .expect_err("gives up");
        assert_eq!(
            err,
            ConnectError::BudgetExhausted {
                attempts: 3,
                last_error: "Connection failed: connection refused".to_string(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_backoff() {
        let broker = InMemoryBroker::new();
        broker.reject_next_connects(u32::MAX);
        let manager = Arc::new(manager(&broker));
        let cancel = CancellationToken::new();

        let task = {
            let manager = Arc::clone(&manager);
            let cancel = cancel.clone();
            tokio::spawn(async move { manager.ensure_ready(&cancel).await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_secs(3)).await;
        cancel.cancel();

        let result = task.await.expect("task joins");
        assert_eq!(result, Err(ConnectError::Cancelled));
    }

    #[tokio::test]
    async fn close_is_terminal() {
        let broker = InMemoryBroker::new();
        let manager = manager(&broker);
        let cancel = CancellationToken::new();

        manager.ensure_ready(&cancel).await.expect("connects");
        manager.close().await;

        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.is_closed());
        let err = manager.ensure_ready(&cancel).await.expect_err("closed");
        assert_eq!(err, ConnectError::Closed);
        assert_eq!(broker.connect_attempts(), 1);
    }
}
