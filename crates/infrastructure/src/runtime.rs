//! Collector runtime
//!
//! Wires configuration into one worker per location. Each worker runs its
//! cycles strictly one after another; workers share the weather client and
//! the broker connection and nothing else. A single cancellation token
//! reaches every sleep point: scheduler waits, fetch backoff and broker
//! reconnect backoff.

use std::sync::Arc;

use application::ports::{ClockPort, ReadingPublisherPort, WeatherSourcePort};
use application::{ApplicationError, CollectionService, CollectorHealth, CycleOutcome};
use futures::future::join_all;
use integration_amqp::{BrokerConnector, ConnectionManager, LapinConnector, Publisher};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};

use crate::adapters::{ClockAdapter, QueuePublisherAdapter, WeatherSourceAdapter};
use crate::config::{AppConfig, ConfigError};
use crate::scheduler::{Clock, Scheduler, SchedulerError, SystemClock, Tick};

/// Errors raised while building or starting the runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration failed validation
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Schedule settings were rejected
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// An adapter could not be created
    #[error(transparent)]
    Application(#[from] ApplicationError),

    /// `start` was called twice
    #[error("Collector is already running")]
    AlreadyStarted,

    /// `start` was called after `stop`
    #[error("Collector has been stopped")]
    Stopped,
}

/// Long-running collector: one scheduled worker per location
pub struct CollectorRuntime {
    services: Vec<Arc<CollectionService>>,
    publisher: Arc<QueuePublisherAdapter>,
    manager: Arc<ConnectionManager>,
    scheduler: Scheduler,
    run_immediately: bool,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
    workers: Mutex<Option<Vec<JoinHandle<()>>>>,
}

impl std::fmt::Debug for CollectorRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorRuntime")
            .field("locations", &self.services.len())
            .field("cadence", &self.scheduler.cadence())
            .field("run_immediately", &self.run_immediately)
            .field("connection", &self.manager.state())
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl CollectorRuntime {
    /// Build a runtime publishing over AMQP with the system clock
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or an adapter
    /// cannot be created. No connection is opened yet.
    pub fn from_config(config: &AppConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        let url = config.broker.url().unwrap_or_default();
        Self::with_connector(
            config,
            Arc::new(LapinConnector::new(url)),
            Arc::new(SystemClock),
        )
    }

    /// Build a runtime over an arbitrary broker transport and clock
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or an adapter
    /// cannot be created.
    pub fn with_connector(
        config: &AppConfig,
        connector: Arc<dyn BrokerConnector>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;
        let locations = config.locations()?;
        let shutdown = CancellationToken::new();

        let mut manager = ConnectionManager::new(
            connector,
            config.broker.topology(),
            config.broker.reconnect.clone(),
        )
        .with_connect_timeout(config.broker.connect_timeout());
        if let Some(budget) = config.broker.connect_budget() {
            manager = manager.with_connect_budget(budget);
        }
        let manager = Arc::new(manager);

        let publisher = Arc::new(QueuePublisherAdapter::new(Arc::new(Publisher::new(
            Arc::clone(&manager),
            config.broker.publish_timeout(),
            shutdown.clone(),
        ))));
        let source: Arc<dyn WeatherSourcePort> = Arc::new(WeatherSourceAdapter::new(
            config.provider.client_config(),
            config.provider.retry.clone(),
            shutdown.clone(),
        )?);

        let cycle_clock: Arc<dyn ClockPort> = Arc::new(ClockAdapter::new(Arc::clone(&clock)));
        let services = locations
            .into_iter()
            .map(|location| {
                let port: Arc<dyn ReadingPublisherPort> = Arc::clone(&publisher) as _;
                Arc::new(
                    CollectionService::new(location, Arc::clone(&source), port)
                        .with_clock(Arc::clone(&cycle_clock)),
                )
            })
            .collect();

        let scheduler = Scheduler::new(
            config.schedule.cadence(),
            config.schedule.max_sleep_chunk(),
            Arc::clone(&clock),
            shutdown.clone(),
        )?;

        Ok(Self {
            services,
            publisher,
            manager,
            scheduler,
            run_immediately: config.schedule.run_immediately,
            clock,
            shutdown,
            workers: Mutex::new(None),
        })
    }

    /// Token cancelled by [`Self::stop`]
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawn one worker per location
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime was already started or stopped.
    pub fn start(&self) -> Result<(), RuntimeError> {
        if self.shutdown.is_cancelled() {
            return Err(RuntimeError::Stopped);
        }
        let mut workers = self.workers.lock();
        if workers.is_some() {
            return Err(RuntimeError::AlreadyStarted);
        }

        let handles = self
            .services
            .iter()
            .map(|service| {
                let span = info_span!("worker", location = %service.location().name());
                tokio::spawn(
                    run_worker(
                        Arc::clone(service),
                        self.scheduler.clone(),
                        self.run_immediately,
                        self.shutdown.clone(),
                    )
                    .instrument(span),
                )
            })
            .collect();
        *workers = Some(handles);

        info!(
            locations = self.services.len(),
            cadence = ?self.scheduler.cadence(),
            run_immediately = self.run_immediately,
            "Collector started"
        );
        Ok(())
    }

    /// Run exactly one cycle for every location, concurrently
    pub async fn run_once(&self) -> Vec<CycleOutcome> {
        join_all(self.services.iter().map(|service| service.run_cycle())).await
    }

    /// Cancel all waits, join the workers and close the broker connection
    ///
    /// In-flight HTTP and broker calls finish or hit their own timeouts.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        let handles = self.workers.lock().take().unwrap_or_default();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Worker ended abnormally");
            }
        }
        self.manager.close().await;
        info!("Collector stopped");
    }

    /// Per-location freshness and broker connection state
    #[must_use]
    pub fn health(&self) -> CollectorHealth {
        let now = self.clock.now();
        CollectorHealth::new(
            self.publisher.connection_state(),
            self.services.iter().map(|s| s.health(now)).collect(),
            now,
        )
    }
}

async fn run_worker(
    service: Arc<CollectionService>,
    scheduler: Scheduler,
    run_immediately: bool,
    shutdown: CancellationToken,
) {
    if !run_immediately && scheduler.wait_for_next().await == Tick::Shutdown {
        return;
    }
    loop {
        if shutdown.is_cancelled() {
            break;
        }
        if service.run_cycle().await == CycleOutcome::Cancelled {
            break;
        }
        if scheduler.wait_for_next().await == Tick::Shutdown {
            break;
        }
    }
    info!("Worker exiting");
}
