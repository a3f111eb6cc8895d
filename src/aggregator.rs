use std::collections::BTreeMap;

use crate::models::{ErrorKey, Outcome, Snapshot};

/// Cumulative probe counters plus the error histogram for the current
/// summary window. `successful_attempts` counts individual successful probes.
#[derive(Debug, Default)]
pub struct Aggregator {
    total_attempts: u64,
    successful_attempts: u64,
    errors: BTreeMap<ErrorKey, u64>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcomes: &[Outcome]) {
        self.total_attempts += outcomes.len() as u64;
        for outcome in outcomes {
            if outcome.success {
                self.successful_attempts += 1;
                continue;
            }
            let key = ErrorKey {
                target: outcome.target.clone(),
                reason: outcome.reason.clone().unwrap_or_else(|| "unknown".into()),
            };
            *self.errors.entry(key).or_insert(0) += 1;
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            total_attempts: self.total_attempts,
            successful_attempts: self.successful_attempts,
            errors: self.errors.clone(),
        }
    }

    pub fn reset_histogram(&mut self) {
        self.errors.clear();
    }
}
