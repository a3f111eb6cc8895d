use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::error::SinkError;
use crate::models::{AuxiliaryStatus, Snapshot};
use crate::utils::format_timestamp;

/// Writes the summary report, replacing any previous one.
pub struct SummaryEmitter {
    path: PathBuf,
}

impl SummaryEmitter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Readers see either the previous report or the new one, never a
    /// partial file.
    pub async fn emit(&self, snapshot: &Snapshot, aux: &[AuxiliaryStatus]) -> Result<(), SinkError> {
        let report = render(snapshot, aux, Local::now());
        let staging = self.path.with_extension("tmp");
        let res = async {
            tokio::fs::write(&staging, report).await?;
            tokio::fs::rename(&staging, &self.path).await
        }
        .await;
        res.map_err(|source| SinkError::Write { path: self.path.clone(), source })
    }
}

pub fn render(snapshot: &Snapshot, aux: &[AuxiliaryStatus], now: DateTime<Local>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Last Updated: {}", format_timestamp(&now));
    let _ = writeln!(out, "Total Attempts: {}", snapshot.total_attempts);
    let _ = writeln!(out, "Successful Attempts: {}", snapshot.successful_attempts);
    let _ = writeln!(out, "Success Rate: {:.2}%", snapshot.success_rate());
    let _ = writeln!(out, "Common Errors:");
    for (key, count) in &snapshot.errors {
        let _ = writeln!(out, "  {}: {} occurrences", key, count);
    }
    for status in aux {
        let _ = writeln!(out, "{}: {}", status.name, status.status);
    }
    out
}
