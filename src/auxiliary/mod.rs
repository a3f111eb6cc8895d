//! Health checks run alongside summary emission.
//!
//! Their results end up as status lines in the summary and never touch the
//! probe counters or the error histogram.

#[cfg(feature = "kube")]
mod cluster;
#[cfg(feature = "postgres")]
mod database;

#[cfg(feature = "kube")]
pub use cluster::ClusterPodCheck;
#[cfg(feature = "postgres")]
pub use database::DatabaseCheck;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::MonitorConfig;
use crate::models::AuxiliaryStatus;

#[async_trait]
pub trait AuxiliaryCheck: Send + Sync {
    /// Label used for the summary line.
    fn name(&self) -> &str;

    async fn check(&self) -> Result<String>;
}

/// Runs each check in order. Errors and timeouts become status strings.
pub async fn run_checks(checks: &[Box<dyn AuxiliaryCheck>], timeout: Duration) -> Vec<AuxiliaryStatus> {
    let mut results = Vec::with_capacity(checks.len());
    for check in checks {
        let status = match tokio::time::timeout(timeout, check.check()).await {
            Ok(Ok(status)) => {
                info!(check = check.name(), %status, "Auxiliary check completed");
                status
            }
            Ok(Err(e)) => {
                let reason = format!("{:#}", e);
                warn!(check = check.name(), error = %reason, "Auxiliary check failed");
                format!("unavailable: {}", reason)
            }
            Err(_) => {
                warn!(check = check.name(), "Auxiliary check timed out");
                format!("unavailable: timed out after {}s", timeout.as_secs_f64())
            }
        };
        results.push(AuxiliaryStatus { name: check.name().to_string(), status });
    }
    results
}

/// Builds the checks enabled in `config` that this binary was compiled with.
pub fn from_config(config: &MonitorConfig) -> Vec<Box<dyn AuxiliaryCheck>> {
    let mut checks: Vec<Box<dyn AuxiliaryCheck>> = Vec::new();

    if let Some(db) = &config.database {
        #[cfg(feature = "postgres")]
        checks.push(Box::new(DatabaseCheck::new(db.clone())));
        #[cfg(not(feature = "postgres"))]
        warn!(host = %db.host, "Database check configured but postgres support is not compiled in");
    }

    if let Some(cluster) = &config.cluster {
        #[cfg(feature = "kube")]
        checks.push(Box::new(ClusterPodCheck::new(cluster.clone())));
        #[cfg(not(feature = "kube"))]
        {
            let _ = cluster;
            warn!("Cluster check configured but kube support is not compiled in");
        }
    }

    checks
}
