use chrono::{DateTime, Local, Timelike};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::SummaryTrigger;

/// Decides at the top of each cycle whether a summary is due.
#[derive(Debug)]
pub struct EmissionClock {
    trigger: SummaryTrigger,
    last_emit: Instant,
}

impl EmissionClock {
    pub fn new(trigger: SummaryTrigger, start: Instant) -> Self {
        Self { trigger, last_emit: start }
    }

    pub fn is_due(&self, wall: DateTime<Local>, now: Instant) -> bool {
        match &self.trigger {
            // Sampled: a cycle longer than a minute can step over minute 0.
            SummaryTrigger::Hourly => wall.minute() == 0,
            SummaryTrigger::EveryCycle => true,
            SummaryTrigger::Elapsed { interval_secs } => {
                now.saturating_duration_since(self.last_emit) >= Duration::from_secs(*interval_secs)
            }
        }
    }

    pub fn mark_emitted(&mut self, now: Instant) {
        self.last_emit = now;
    }
}
