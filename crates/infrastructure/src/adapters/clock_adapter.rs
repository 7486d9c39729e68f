//! Clock adapter - Implements ClockPort over the scheduler clock

use std::sync::Arc;

use application::ports::ClockPort;
use chrono::{DateTime, Utc};

use crate::scheduler::Clock;

/// Lets collection cycles read the same clock the scheduler sleeps on
#[derive(Debug, Clone)]
pub struct ClockAdapter {
    clock: Arc<dyn Clock>,
}

impl ClockAdapter {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl ClockPort for ClockAdapter {
    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
