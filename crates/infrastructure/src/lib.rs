//! Infrastructure layer - Adapters, configuration and process plumbing
//!
//! Implements the application ports on top of the weather HTTP client and
//! the AMQP publisher, and provides what a long-running collector needs
//! around them: layered configuration, retry with backoff, a drift-correcting
//! scheduler, logging setup and the [`CollectorRuntime`] that ties it all
//! together.

pub mod adapters;
pub mod config;
pub mod retry;
pub mod runtime;
pub mod scheduler;
pub mod telemetry;

pub use adapters::*;
pub use config::{
    AppConfig, BrokerConfig, ConfigError, LocationConfig, ProviderConfig, ScheduleConfig,
    ScheduleMode,
};
pub use retry::{RetryConfig, RetryResult, Retryable, with_retry};
pub use runtime::{CollectorRuntime, RuntimeError};
pub use scheduler::{Cadence, Clock, Scheduler, SchedulerError, SystemClock, Tick};
pub use telemetry::{LogFormat, LoggingConfig, TelemetryError, init_logging};
