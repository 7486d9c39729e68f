//! Collection cadence settings

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::default_true;
use crate::scheduler::Cadence;

/// How cycles are spaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    /// Fixed delay after each completed cycle
    #[default]
    Interval,
    /// Top of every wall-clock hour
    Hourly,
}

impl fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interval => write!(f, "interval"),
            Self::Hourly => write!(f, "hourly"),
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Cadence mode (default: interval)
    #[serde(default)]
    pub mode: ScheduleMode,

    /// Delay between cycles in interval mode (default: 3600)
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Longest single sleep before the clock is re-read (default: 60)
    #[serde(default = "default_max_sleep_chunk")]
    pub max_sleep_chunk_secs: u64,

    /// Run the first cycle at startup instead of waiting (default: true)
    #[serde(default = "default_true")]
    pub run_immediately: bool,
}

const fn default_interval() -> u64 {
    3600
}

const fn default_max_sleep_chunk() -> u64 {
    60
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            mode: ScheduleMode::default(),
            interval_secs: default_interval(),
            max_sleep_chunk_secs: default_max_sleep_chunk(),
            run_immediately: default_true(),
        }
    }
}

impl ScheduleConfig {
    #[must_use]
    pub const fn cadence(&self) -> Cadence {
        match self.mode {
            ScheduleMode::Interval => Cadence::Interval(Duration::from_secs(self.interval_secs)),
            ScheduleMode::Hourly => Cadence::Hourly,
        }
    }

    #[must_use]
    pub const fn max_sleep_chunk(&self) -> Duration {
        Duration::from_secs(self.max_sleep_chunk_secs)
    }
}
