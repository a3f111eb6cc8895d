use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::models::{Outcome, Target};
use crate::probe::Probe;

/// Probes every target with at most `concurrency` requests in flight,
/// spacing submissions by `launch_delay`. Returns once all probes have
/// finished; outcomes are in completion order.
pub async fn run_batch(
    prober: Arc<dyn Probe>,
    targets: &[Target],
    concurrency: usize,
    launch_delay: Duration,
) -> Vec<Outcome> {
    let limiter = Arc::new(Semaphore::new(concurrency.clamp(1, Semaphore::MAX_PERMITS)));
    let mut tasks = FuturesUnordered::new();

    for (i, target) in targets.iter().enumerate() {
        if i > 0 && !launch_delay.is_zero() {
            tokio::time::sleep(launch_delay).await;
        }

        let prober = Arc::clone(&prober);
        let limiter = Arc::clone(&limiter);
        let t_clone = target.clone();
        let handle = tokio::spawn(async move {
            let _permit = limiter.acquire_owned().await.ok();
            prober.probe(&t_clone).await
        });

        let url = target.url.clone();
        tasks.push(async move {
            handle.await.unwrap_or_else(|e| {
                error!(url = %url, error = %e, "Probe task aborted");
                Outcome::failure(url, "probe task aborted")
            })
        });
    }

    let mut outcomes = Vec::with_capacity(targets.len());
    while let Some(outcome) = tasks.next().await {
        outcomes.push(outcome);
    }
    debug!(probes = outcomes.len(), "Batch drained");
    outcomes
}
