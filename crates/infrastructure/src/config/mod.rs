//! Collector configuration
//!
//! Split into focused sub-modules:
//! - `broker`: AMQP connection, topology, reconnect backoff
//! - `provider`: weather provider, HTTP timeout and fetch retry
//! - `schedule`: collection cadence
//!
//! Sources, lowest precedence first: built-in defaults, then
//! `collector.toml` in the working directory (or an explicit file), then
//! `COLLECTOR__*` environment variables with `__` between path segments,
//! e.g. `COLLECTOR__BROKER__URL`.

mod broker;
mod provider;
mod schedule;

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::Path;

use domain::value_objects::Location;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use broker::BrokerConfig;
pub use provider::ProviderConfig;
pub use schedule::{ScheduleConfig, ScheduleMode};

pub use crate::telemetry::{LogFormat, LoggingConfig};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "COLLECTOR";

/// Config file looked up in the working directory (any supported extension)
pub const DEFAULT_CONFIG_FILE: &str = "collector";

/// Shared default for boolean `true` fields across config structs
pub(crate) const fn default_true() -> bool {
    true
}

/// Configuration errors; all of them are fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or did not match the expected shape
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// Values loaded but failed validation
    #[error("Invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// One configured location, validated into a [`Location`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Main collector configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Message broker
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Weather provider
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Collection cadence
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Locations to collect, at least one
    #[serde(default)]
    pub locations: Vec<LocationConfig>,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from defaults, a file and the environment
    ///
    /// With `path` set the file must exist; otherwise `collector.*` in the
    /// working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Like [`Self::load`], reading environment overrides from `env`
    /// instead of the process environment when given
    fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let builder = config::Config::builder()
            // Start with defaults
            .set_default("schedule.mode", "interval")?
            .set_default("logging.filter", "info")?
            // Load from file if exists
            .add_source(file)
            // Override with environment variables (e.g., COLLECTOR__BROKER__URL)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            );

        let config: Self = builder.build()?.try_deserialize()?;
        debug!(locations = config.locations.len(), "Configuration loaded");
        Ok(config)
    }

    /// Check everything that would otherwise fail later at runtime
    ///
    /// All problems are reported together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        match self.broker.url().map(str::trim) {
            None | Some("") => problems.push("broker.url is required".to_string()),
            Some(url) if !(url.starts_with("amqp://") || url.starts_with("amqps://")) => {
                problems.push("broker.url must use the amqp:// or amqps:// scheme".to_string());
            },
            Some(_) => {},
        }
        if self.broker.queue.trim().is_empty() {
            problems.push("broker.queue must not be empty".to_string());
        }
        if self.broker.publish_timeout_secs == 0 {
            problems.push("broker.publish_timeout_secs must be greater than zero".to_string());
        }
        if self.broker.connect_timeout_secs == 0 {
            problems.push("broker.connect_timeout_secs must be greater than zero".to_string());
        }

        if self.provider.kind.requires_api_key() && !self.provider.has_api_key() {
            problems.push(format!(
                "provider.api_key is required for {}",
                self.provider.kind
            ));
        }
        if self.provider.timeout_secs == 0 {
            problems.push("provider.timeout_secs must be greater than zero".to_string());
        }

        if self.schedule.mode == ScheduleMode::Interval && self.schedule.interval_secs == 0 {
            problems.push("schedule.interval_secs must be greater than zero".to_string());
        }
        if self.schedule.max_sleep_chunk_secs == 0 {
            problems.push("schedule.max_sleep_chunk_secs must be greater than zero".to_string());
        }

        problems.extend(self.check_locations().1);

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    /// Validated locations in configuration order
    pub fn locations(&self) -> Result<Vec<Location>, ConfigError> {
        let (locations, problems) = self.check_locations();
        if problems.is_empty() {
            Ok(locations)
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    fn check_locations(&self) -> (Vec<Location>, Vec<String>) {
        let mut locations = Vec::with_capacity(self.locations.len());
        let mut problems = Vec::new();
        let mut seen = HashSet::new();

        if self.locations.is_empty() {
            problems.push("at least one location is required".to_string());
        }
        for (i, entry) in self.locations.iter().enumerate() {
            match Location::new(entry.name.clone(), entry.latitude, entry.longitude) {
                Ok(location) => {
                    if seen.insert(location.name().to_string()) {
                        locations.push(location);
                    } else {
                        problems.push(format!(
                            "locations[{i}]: duplicate location name '{}'",
                            entry.name
                        ));
                    }
                },
                Err(e) => problems.push(format!("locations[{i}] ({}): {e}", entry.name)),
            }
        }
        (locations, problems)
    }

    /// Human-readable summary of the effective configuration, secrets masked
    pub fn redacted_summary(&self) -> String {
        let mut out = String::new();
        let provider = &self.provider;
        let _ = writeln!(
            out,
            "provider: {} {} (timeout {}s, max retries {}, api key {})",
            provider.kind,
            provider.base_url(),
            provider.timeout_secs,
            provider.retry.max_retries,
            if provider.has_api_key() { "set" } else { "unset" },
        );

        let broker = &self.broker;
        let exchange = if broker.exchange.is_empty() {
            "<default>"
        } else {
            broker.exchange.as_str()
        };
        let _ = writeln!(
            out,
            "broker: {} queue={} exchange={} (publish timeout {}s, connect timeout {}s, connect budget {}s)",
            broker.redacted_url(),
            broker.queue,
            exchange,
            broker.publish_timeout_secs,
            broker.connect_timeout_secs,
            broker.connect_budget_secs,
        );

        let schedule = &self.schedule;
        match schedule.mode {
            ScheduleMode::Interval => {
                let _ = write!(out, "schedule: every {}s", schedule.interval_secs);
            },
            ScheduleMode::Hourly => {
                let _ = write!(out, "schedule: hourly");
            },
        }
        let _ = writeln!(
            out,
            " (sleep chunk {}s, run immediately {})",
            schedule.max_sleep_chunk_secs, schedule.run_immediately,
        );

        let names: Vec<String> = self
            .locations
            .iter()
            .map(|l| format!("{} ({}, {})", l.name, l.latitude, l.longitude))
            .collect();
        let _ = writeln!(out, "locations: {}", names.join(", "));
        let _ = write!(
            out,
            "logging: {} ({:?})",
            self.logging.filter, self.logging.format
        );
        out
    }
}
