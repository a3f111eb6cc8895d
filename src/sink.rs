use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::SinkError;
use crate::models::Outcome;
use crate::utils::format_timestamp;

/// Append-only probe log. Each outcome becomes one timestamped line.
pub struct LogSink {
    path: PathBuf,
    file: File,
}

impl LogSink {
    pub async fn open(path: &Path) -> Result<Self, SinkError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|source| SinkError::Open { path: path.to_path_buf(), source })?;
        Ok(Self { path: path.to_path_buf(), file })
    }

    pub async fn record(&mut self, outcomes: &[Outcome]) -> Result<(), SinkError> {
        let mut buf = String::new();
        for outcome in outcomes {
            let line = log_line(outcome);
            if outcome.success {
                info!("{}", line);
            } else {
                warn!("{}", line);
            }
            buf.push_str(&line);
            buf.push('\n');
        }
        self.write(buf.as_bytes()).await
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        let res = async {
            self.file.write_all(bytes).await?;
            self.file.flush().await
        }
        .await;
        res.map_err(|source| SinkError::Write { path: self.path.clone(), source })
    }
}

pub fn log_line(outcome: &Outcome) -> String {
    let ts = format_timestamp(&outcome.timestamp);
    match &outcome.reason {
        None => format!("[{}] SUCCESS: Connected to {}", ts, outcome.target),
        Some(reason) => format!("[{}] ERROR: Failed to connect to {} - {}", ts, outcome.target, reason),
    }
}
