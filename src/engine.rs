use anyhow::{Context, Result};
use chrono::Local;
use std::path::Path;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::aggregator::Aggregator;
use crate::auxiliary::{self, AuxiliaryCheck};
use crate::batch::run_batch;
use crate::config::MonitorConfig;
use crate::models::{Outcome, Snapshot};
use crate::probe::{HttpProber, Probe};
use crate::schedule::EmissionClock;
use crate::sink::LogSink;
use crate::summary::SummaryEmitter;

pub struct Monitor {
    config: MonitorConfig,
    prober: Arc<dyn Probe>,
    log: LogSink,
    emitter: SummaryEmitter,
    aggregator: Aggregator,
    checks: Vec<Box<dyn AuxiliaryCheck>>,
    clock: EmissionClock,
}

impl Monitor {
    /// Creates `log_dir` if needed and opens the log sink inside it.
    pub async fn new(config: MonitorConfig, log_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(log_dir)
            .await
            .with_context(|| format!("Failed to create {}", log_dir.display()))?;

        let prober = Arc::new(HttpProber::new(config.timeout())?);
        let log = LogSink::open(&log_dir.join("log")).await?;
        let emitter = SummaryEmitter::new(log_dir.join("summary"));
        let checks = auxiliary::from_config(&config);

        Ok(Self::with_parts(config, prober, log, emitter, checks))
    }

    pub fn with_parts(
        config: MonitorConfig,
        prober: Arc<dyn Probe>,
        log: LogSink,
        emitter: SummaryEmitter,
        checks: Vec<Box<dyn AuxiliaryCheck>>,
    ) -> Self {
        let clock = EmissionClock::new(config.summary.clone(), Instant::now());
        Self {
            config,
            prober,
            log,
            emitter,
            aggregator: Aggregator::new(),
            checks,
            clock,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.aggregator.snapshot()
    }

    /// Cycles until `shutdown` fires. Only sink failures end the loop early.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        info!(
            internal = %self.config.internal.url,
            external = self.config.external.len(),
            interval_secs = self.config.check_interval,
            "Prober loop started"
        );

        while !shutdown.is_cancelled() {
            let due = self.clock.is_due(Local::now(), Instant::now());
            self.run_cycle(&shutdown).await?;
            if due {
                self.emit_summary().await?;
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.sleep_interval()) => {}
            }
        }

        info!("Prober loop stopped");
        Ok(())
    }

    /// Single cycle followed by an unconditional summary.
    pub async fn run_once(&mut self) -> Result<()> {
        self.run_cycle(&CancellationToken::new()).await?;
        self.emit_summary().await
    }

    /// Probes internal then external targets. Each batch is logged as soon
    /// as it drains; the cycle is aggregated once both have finished. A
    /// cancelled token skips batches that have not started.
    pub async fn run_cycle(&mut self, shutdown: &CancellationToken) -> Result<()> {
        let started = Instant::now();
        let mut outcomes: Vec<Outcome> = Vec::new();

        for targets in [self.config.internal_targets(), self.config.external_targets()] {
            if shutdown.is_cancelled() {
                warn!("Shutdown requested, skipping remaining probes");
                break;
            }
            let batch = run_batch(
                Arc::clone(&self.prober),
                &targets,
                self.config.max_concurrency,
                self.config.launch_delay(),
            )
            .await;
            self.log.record(&batch).await?;
            outcomes.extend(batch);
        }

        self.aggregator.record(&outcomes);

        let ok = outcomes.iter().filter(|o| o.success).count();
        info!(
            "Cycle completed {} probes ({} ok) in {:.2}s.",
            outcomes.len(),
            ok,
            started.elapsed().as_secs_f64()
        );
        Ok(())
    }

    /// Runs auxiliary checks, rewrites the summary, then clears the histogram.
    pub async fn emit_summary(&mut self) -> Result<()> {
        let statuses = auxiliary::run_checks(&self.checks, self.config.aux_timeout()).await;
        let snapshot = self.snapshot();
        self.emitter.emit(&snapshot, &statuses).await?;
        self.aggregator.reset_histogram();
        self.clock.mark_emitted(Instant::now());

        info!(
            path = %self.emitter.path().display(),
            total = snapshot.total_attempts,
            successful = snapshot.successful_attempts,
            "Summary written: {:.2}% success",
            snapshot.success_rate()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Endpoint, SummaryTrigger};
    use crate::models::{ErrorKey, Target};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    const INTERNAL: &str = "http://internal-dns-test/";
    const EXTERNAL: &str = "http://www.wm.edu";

    /// Internal probes follow a fixed script; everything else succeeds.
    struct Scripted {
        internal: Mutex<Vec<Option<&'static str>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(script: Vec<Option<&'static str>>) -> Arc<Self> {
            Arc::new(Self { internal: Mutex::new(script), calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl Probe for Scripted {
        async fn probe(&self, target: &Target) -> Outcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if target.url != INTERNAL {
                return Outcome::success(&target.url);
            }
            match self.internal.lock().unwrap().pop().flatten() {
                Some(reason) => Outcome::failure(&target.url, reason),
                None => Outcome::success(&target.url),
            }
        }
    }

    struct StaticCheck;

    #[async_trait]
    impl AuxiliaryCheck for StaticCheck {
        fn name(&self) -> &str {
            "Database Status"
        }

        async fn check(&self) -> Result<String> {
            anyhow::bail!("password authentication failed")
        }
    }

    fn config(internal_repeat: usize, summary: SummaryTrigger) -> MonitorConfig {
        MonitorConfig {
            internal: Endpoint { url: INTERNAL.into(), headers: HashMap::new(), repeat: internal_repeat },
            external: vec![Endpoint { url: EXTERNAL.into(), headers: HashMap::new(), repeat: 1 }],
            max_concurrency: 2,
            summary,
            ..Default::default()
        }
    }

    async fn monitor(
        dir: &Path,
        config: MonitorConfig,
        prober: Arc<dyn Probe>,
        checks: Vec<Box<dyn AuxiliaryCheck>>,
    ) -> Monitor {
        let log = LogSink::open(&dir.join("log")).await.unwrap();
        Monitor::with_parts(config, prober, log, SummaryEmitter::new(dir.join("summary")), checks)
    }

    #[tokio::test]
    async fn one_cycle_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let prober = Scripted::new(vec![None, Some("timeout"), None]);
        let mut monitor = monitor(dir.path(), config(3, SummaryTrigger::EveryCycle), prober, vec![]).await;

        monitor.run_cycle(&CancellationToken::new()).await.unwrap();

        let snap = monitor.snapshot();
        assert_eq!(snap.total_attempts, 4);
        assert_eq!(snap.successful_attempts, 3);
        let key = ErrorKey { target: INTERNAL.into(), reason: "timeout".into() };
        assert_eq!(snap.errors.len(), 1);
        assert_eq!(snap.errors.get(&key), Some(&1));

        monitor.emit_summary().await.unwrap();
        let summary = std::fs::read_to_string(dir.path().join("summary")).unwrap();
        assert!(summary.contains("Success Rate: 75.00%\n"));
        assert!(summary.contains("  http://internal-dns-test/ - timeout: 1 occurrences\n"));

        let after = monitor.snapshot();
        assert!(after.errors.is_empty());
        assert_eq!(after.total_attempts, 4);
        assert_eq!(after.successful_attempts, 3);

        let log = std::fs::read_to_string(dir.path().join("log")).unwrap();
        assert_eq!(log.lines().count(), 4);
        assert_eq!(log.lines().filter(|l| l.contains("] ERROR: ")).count(), 1);
    }

    #[tokio::test]
    async fn run_once_includes_failed_aux_check() {
        let dir = tempfile::tempdir().unwrap();
        let prober = Scripted::new(vec![]);
        let checks: Vec<Box<dyn AuxiliaryCheck>> = vec![Box::new(StaticCheck)];
        let mut monitor = monitor(dir.path(), config(2, SummaryTrigger::Hourly), prober, checks).await;

        monitor.run_once().await.unwrap();

        let summary = std::fs::read_to_string(dir.path().join("summary")).unwrap();
        assert!(summary.contains("Total Attempts: 3\n"));
        assert!(summary.contains("Success Rate: 100.00%\n"));
        assert!(summary.ends_with("Database Status: unavailable: password authentication failed\n"));
    }

    #[tokio::test]
    async fn cancelled_cycle_skips_probes() {
        let dir = tempfile::tempdir().unwrap();
        let prober = Scripted::new(vec![]);
        let mut monitor = monitor(dir.path(), config(5, SummaryTrigger::EveryCycle), prober.clone(), vec![]).await;

        let token = CancellationToken::new();
        token.cancel();
        monitor.run_cycle(&token).await.unwrap();

        assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
        assert_eq!(monitor.snapshot().total_attempts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_emits_every_cycle_and_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let prober = Scripted::new(vec![Some("HTTP 502"); 8]);
        let mut cfg = config(1, SummaryTrigger::EveryCycle);
        cfg.check_interval = 120;
        let monitor = monitor(dir.path(), cfg, prober.clone(), vec![]).await;

        let token = CancellationToken::new();
        let handle = tokio::spawn(monitor.run(token.clone()));

        // Cycles start at t=0 and t=120; the next would start at t=240.
        tokio::time::sleep(Duration::from_secs(180)).await;
        token.cancel();
        handle.await.unwrap().unwrap();

        assert_eq!(prober.calls.load(Ordering::SeqCst), 4);
        let summary = std::fs::read_to_string(dir.path().join("summary")).unwrap();
        assert!(summary.contains("Total Attempts: 4\n"));
        assert!(summary.contains("Successful Attempts: 2\n"));
        // Histogram holds only the last cycle's failure.
        assert!(summary.contains("  http://internal-dns-test/ - HTTP 502: 1 occurrences\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_trigger_waits_for_interval() {
        let dir = tempfile::tempdir().unwrap();
        let prober = Scripted::new(vec![]);
        let mut cfg = config(1, SummaryTrigger::Elapsed { interval_secs: 300 });
        cfg.check_interval = 120;
        let monitor = monitor(dir.path(), cfg, prober, vec![]).await;

        let token = CancellationToken::new();
        let handle = tokio::spawn(monitor.run(token.clone()));

        // Cycles start at t=0, 120 and 240; none of them is 300s past start.
        tokio::time::sleep(Duration::from_secs(250)).await;
        assert!(!dir.path().join("summary").exists());

        // The cycle at t=360 emits.
        tokio::time::sleep(Duration::from_secs(120)).await;
        token.cancel();
        handle.await.unwrap().unwrap();
        let summary = std::fs::read_to_string(dir.path().join("summary")).unwrap();
        assert!(summary.contains("Total Attempts: 8\n"));
    }

    #[tokio::test]
    async fn failed_summary_write_keeps_histogram() {
        let dir = tempfile::tempdir().unwrap();
        let prober = Scripted::new(vec![Some("timeout"), Some("HTTP 500")]);
        let log = LogSink::open(&dir.path().join("log")).await.unwrap();
        let emitter = SummaryEmitter::new(dir.path().join("missing/summary"));
        let mut monitor =
            Monitor::with_parts(config(2, SummaryTrigger::EveryCycle), prober, log, emitter, vec![]);

        monitor.run_cycle(&CancellationToken::new()).await.unwrap();
        let before = monitor.snapshot();
        assert_eq!(before.errors.len(), 2);

        assert!(monitor.emit_summary().await.is_err());
        assert_eq!(monitor.snapshot(), before);
    }

    #[tokio::test]
    async fn loop_stops_on_summary_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let log = LogSink::open(&dir.path().join("log")).await.unwrap();
        let emitter = SummaryEmitter::new(dir.path().join("missing/summary"));
        let monitor = Monitor::with_parts(
            config(1, SummaryTrigger::EveryCycle),
            Scripted::new(vec![]),
            log,
            emitter,
            vec![],
        );

        let token = CancellationToken::new();
        let res = tokio::time::timeout(Duration::from_secs(60), monitor.run(token.clone())).await;
        let err = res.expect("loop should stop on its own").unwrap_err();
        assert!(format!("{:#}", err).contains("missing/summary"));
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn internal_batch_logged_before_external_runs() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("log");
        let prober = Arc::new(LogPeek { log: log_path.clone(), seen: Mutex::new(None) });
        let mut monitor =
            monitor(dir.path(), config(3, SummaryTrigger::EveryCycle), prober.clone(), vec![]).await;

        monitor.run_cycle(&CancellationToken::new()).await.unwrap();

        assert_eq!(*prober.seen.lock().unwrap(), Some(3));
        assert_eq!(std::fs::read_to_string(&log_path).unwrap().lines().count(), 4);
    }

    /// Records how many log lines exist when the external target is reached.
    struct LogPeek {
        log: std::path::PathBuf,
        seen: Mutex<Option<usize>>,
    }

    #[async_trait]
    impl Probe for LogPeek {
        async fn probe(&self, target: &Target) -> Outcome {
            if target.url == EXTERNAL {
                let lines = std::fs::read_to_string(&self.log).map(|c| c.lines().count()).unwrap_or(0);
                *self.seen.lock().unwrap() = Some(lines);
            }
            Outcome::success(&target.url)
        }
    }
}
