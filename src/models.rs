use chrono::{DateTime, Local};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub url: String,
    pub headers: HashMap<String, String>,
}

impl Target {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), headers: HashMap::new() }
    }
}

/// Result of a single probe. `reason` is set iff the probe failed.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub target: String,
    pub success: bool,
    pub reason: Option<String>,
    pub timestamp: DateTime<Local>,
}

impl Outcome {
    pub fn success(target: impl Into<String>) -> Self {
        Self { target: target.into(), success: true, reason: None, timestamp: Local::now() }
    }

    pub fn failure(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            success: false,
            reason: Some(reason.into()),
            timestamp: Local::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ErrorKey {
    pub target: String,
    pub reason: String,
}

impl fmt::Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.target, self.reason)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub total_attempts: u64,
    pub successful_attempts: u64,
    pub errors: BTreeMap<ErrorKey, u64>,
}

impl Snapshot {
    pub fn success_rate(&self) -> f64 {
        if self.total_attempts == 0 {
            return 0.0;
        }
        self.successful_attempts as f64 / self.total_attempts as f64 * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryStatus {
    pub name: String,
    pub status: String,
}
