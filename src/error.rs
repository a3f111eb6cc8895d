use std::path::PathBuf;
use thiserror::Error;

/// Failures of the log or summary file. These end the process.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to open {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
