use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod aggregator;
mod auxiliary;
mod batch;
mod config;
mod engine;
mod error;
mod models;
mod probe;
mod schedule;
mod sink;
mod summary;
mod utils;

use crate::config::MonitorConfig;
use crate::engine::Monitor;

#[derive(Debug, Parser)]
#[command(version, about = "Probe internal name resolution and egress, summarising to flat files")]
struct Args {
    /// Namespace for the log and summary directory.
    #[arg(long, env = "DNS_PROBER_MODE")]
    mode: Option<String>,

    /// JSON configuration; built-in defaults when omitted.
    #[arg(long, env = "DNS_PROBER_CONFIG")]
    config: Option<PathBuf>,

    /// Run a single cycle, write the summary and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::INFO.into()))
        .with_ansi(true)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::default(),
    };
    let log_dir = config.log_dir(args.mode.as_deref());
    info!(dir = %log_dir.display(), "Writing probe log and summary");

    let mut monitor = Monitor::new(config, &log_dir).await?;

    let result = if args.once {
        monitor.run_once().await
    } else {
        let shutdown = CancellationToken::new();
        tokio::spawn(wait_for_shutdown(shutdown.clone()));
        monitor.run(shutdown).await
    };

    if let Err(e) = &result {
        error!("Prober stopped: {:#}", e);
    }
    result
}

async fn wait_for_shutdown(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    let _ = tokio::signal::ctrl_c().await;

    info!("Shutdown signal received. Draining in-flight probes...");
    token.cancel();
}
