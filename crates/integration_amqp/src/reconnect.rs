//! Broker reconnect backoff policy
//!
//! Same bounded exponential shape as the fetch retry policy, with a higher
//! ceiling: broker outages are expected to outlast a single HTTP hiccup.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for reconnection behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Initial delay before first retry (in milliseconds)
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries (in milliseconds)
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Maximum number of retry attempts (0 = infinite)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Multiplier for exponential backoff
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Jitter factor (0.0 - 1.0) to add randomness to delays
    #[serde(default = "default_jitter")]
    pub jitter_factor: f64,
}

const fn default_initial_delay() -> u64 {
    1000 // 1 second
}

const fn default_max_delay() -> u64 {
    60000 // 1 minute
}

const fn default_max_retries() -> u32 {
    0 // Infinite retries
}

const fn default_backoff_multiplier() -> f64 {
    2.0
}

const fn default_jitter() -> f64 {
    0.1
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            max_retries: default_max_retries(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter_factor: default_jitter(),
        }
    }
}

impl ReconnectConfig {
    /// Calculate delay for a given attempt number (0-based)
    ///
    /// The result never exceeds `max_delay_ms`, jitter included.
    #[allow(clippy::cast_precision_loss)]
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(30);
        let base_delay = self.initial_delay_ms as f64
            * self
                .backoff_multiplier
                .powi(i32::try_from(exponent).unwrap_or(30));
        let max_delay = self.max_delay_ms as f64;
        let capped_delay = base_delay.min(max_delay);

        let jitter_range = capped_delay * self.jitter_factor.clamp(0.0, 1.0);
        let jitter = if jitter_range > 0.0 {
            rand::rng().random_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };

        let final_delay = (capped_delay + jitter).clamp(0.0, max_delay);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Duration::from_millis(final_delay as u64)
    }

    /// Check if more retries are allowed
    pub const fn should_retry(&self, attempt: u32) -> bool {
        self.max_retries == 0 || attempt < self.max_retries
    }

    /// Upper bound of any single backoff sleep
    pub const fn ceiling(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}
