use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::Target;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default = "default_log_root")]
    pub log_root: PathBuf,
    #[serde(default = "default_internal")]
    pub internal: Endpoint,
    #[serde(default = "default_external")]
    pub external: Vec<Endpoint>,
    /// Seconds slept between cycles.
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub launch_delay_ms: u64,
    #[serde(default)]
    pub summary: SummaryTrigger,
    #[serde(default = "default_aux_timeout")]
    pub aux_timeout_ms: u64,
    pub database: Option<DatabaseConfig>,
    pub cluster: Option<ClusterConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Endpoint {
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Probes of this endpoint per cycle.
    #[serde(default = "default_repeat")]
    pub repeat: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SummaryTrigger {
    /// Fires when the local wall-clock minute is zero at the top of a cycle.
    Hourly,
    EveryCycle,
    Elapsed {
        #[serde(default = "default_summary_interval")]
        interval_secs: u64,
    },
}

impl Default for SummaryTrigger {
    fn default() -> Self {
        SummaryTrigger::Elapsed { interval_secs: default_summary_interval() }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    pub user: String,
    /// Falls back to `PGPASSWORD` when absent.
    pub password: Option<String>,
    pub database: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ClusterConfig {
    pub kubeconfig: Option<PathBuf>,
    /// All namespaces when unset.
    pub namespace: Option<String>,
}

fn default_log_root() -> PathBuf { PathBuf::from("/sciclone/geograd/K8S_DNS_RES_ERROR") }
fn default_internal() -> Endpoint {
    Endpoint { url: "http://internal-dns-test/".into(), headers: HashMap::new(), repeat: 100 }
}
fn default_external() -> Vec<Endpoint> {
    vec![Endpoint { url: "http://www.wm.edu".into(), headers: HashMap::new(), repeat: 1 }]
}
fn default_check_interval() -> u64 { 300 }
fn default_max_concurrency() -> usize { 10 }
fn default_repeat() -> usize { 1 }
fn default_summary_interval() -> u64 { 3600 }
fn default_aux_timeout() -> u64 { 10_000 }
fn default_db_port() -> u16 { 5432 }
pub fn default_timeout() -> u64 { 5000 }

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_root: default_log_root(),
            internal: default_internal(),
            external: default_external(),
            check_interval: default_check_interval(),
            timeout_ms: default_timeout(),
            max_concurrency: default_max_concurrency(),
            launch_delay_ms: 0,
            summary: SummaryTrigger::default(),
            aux_timeout_ms: default_aux_timeout(),
            database: None,
            cluster: None,
        }
    }
}

impl MonitorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Directory holding `log` and `summary`, namespaced by the run mode.
    pub fn log_dir(&self, mode: Option<&str>) -> PathBuf {
        match mode {
            Some(mode) if !mode.is_empty() => self.log_root.join(mode),
            _ => self.log_root.clone(),
        }
    }

    pub fn internal_targets(&self) -> Vec<Target> {
        self.internal.expand()
    }

    pub fn external_targets(&self) -> Vec<Target> {
        self.external.iter().flat_map(Endpoint::expand).collect()
    }

    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }
    pub fn launch_delay(&self) -> Duration { Duration::from_millis(self.launch_delay_ms) }
    pub fn sleep_interval(&self) -> Duration { Duration::from_secs(self.check_interval) }
    pub fn aux_timeout(&self) -> Duration { Duration::from_millis(self.aux_timeout_ms) }
}

impl Endpoint {
    fn expand(&self) -> Vec<Target> {
        let target = Target { headers: self.headers.clone(), ..Target::new(&self.url) };
        vec![target; self.repeat]
    }
}
