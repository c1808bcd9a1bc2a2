// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Configuration file and environment resolution.
//!
//! Resolved once at startup and passed into constructors; nothing reads
//! configuration from process-wide state afterwards. Environment variables
//! (`LATTICE_*`) override file values.

use anyhow::Context as _;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct FileConfig {
    pub state_dir: Option<PathBuf>,
    pub dags_dir: Option<PathBuf>,
    pub default_shell: Option<String>,
    pub retention_days: Option<i64>,
    pub coordinator: CoordinatorSection,
    pub worker: WorkerSection,
    pub scheduler: SchedulerSection,
    pub tls: TlsSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoordinatorSection {
    /// Bind address for `lattice coordinator`.
    pub listen: String,
    /// Endpoints clients dispatch to / workers poll, e.g. `http://host:50055`.
    pub endpoints: Vec<String>,
}

impl Default for CoordinatorSection {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:50055".to_string(),
            endpoints: vec!["http://127.0.0.1:50055".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkerSection {
    pub id: Option<String>,
    pub max_active_runs: usize,
    pub labels: HashMap<String, String>,
    pub heartbeat_interval_secs: u64,
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            id: None,
            max_active_runs: 1,
            labels: HashMap::new(),
            heartbeat_interval_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerSection {
    pub tick_interval_secs: u64,
    pub catchup_window_minutes: i64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self { tick_interval_secs: 10, catchup_window_minutes: 60 }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct TlsSection {
    pub ca_file: Option<PathBuf>,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub server_name: Option<String>,
    pub skip_tls_verify: bool,
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// The explicit `--config` path, forwarded to spawned sub-commands.
    pub config_path: Option<PathBuf>,
    pub state_dir: PathBuf,
    pub dags_dir: PathBuf,
    pub default_shell: String,
    pub retention_days: i64,
    pub coordinator: CoordinatorSection,
    pub worker: WorkerSection,
    pub scheduler: SchedulerSection,
    pub tls: TlsSection,
}

impl Config {
    pub fn load(config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let file = match &config_path {
            Some(path) => {
                let data = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_yaml::from_str::<FileConfig>(&data)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => default_config_file()
                .and_then(|path| std::fs::read_to_string(path).ok())
                .map(|data| serde_yaml::from_str::<FileConfig>(&data))
                .transpose()
                .context("parsing default config file")?
                .unwrap_or_default(),
        };

        let state_dir = env_path("LATTICE_STATE_DIR")
            .or(file.state_dir)
            .or_else(|| dirs::data_dir().map(|d| d.join("lattice")))
            .unwrap_or_else(|| PathBuf::from(".lattice"));
        let dags_dir = env_path("LATTICE_DAGS_DIR")
            .or(file.dags_dir)
            .unwrap_or_else(|| state_dir.join("dags"));
        let default_shell = std::env::var("LATTICE_DEFAULT_SHELL")
            .ok()
            .or(file.default_shell)
            .or_else(|| std::env::var("SHELL").ok())
            .unwrap_or_else(|| "sh".to_string());

        let mut coordinator = file.coordinator;
        if let Ok(endpoint) = std::env::var("LATTICE_COORDINATOR_ENDPOINT") {
            coordinator.endpoints = vec![endpoint];
        }

        Ok(Self {
            config_path,
            state_dir,
            dags_dir,
            default_shell,
            retention_days: file.retention_days.unwrap_or(30),
            coordinator,
            worker: file.worker,
            scheduler: file.scheduler,
            tls: file.tls,
        })
    }

    /// Endpoint used for dispatching; one coordinator per client process.
    pub fn dispatch_endpoint(&self) -> &str {
        self.coordinator
            .endpoints
            .first()
            .map(String::as_str)
            .unwrap_or("http://127.0.0.1:50055")
    }

    pub fn tls_config(&self) -> Option<lx_coord::TlsConfig> {
        let tls = lx_coord::TlsConfig {
            ca_file: self.tls.ca_file.clone(),
            cert_file: self.tls.cert_file.clone(),
            key_file: self.tls.key_file.clone(),
            server_name: self.tls.server_name.clone(),
            skip_verify: self.tls.skip_tls_verify,
        };
        if tls.is_empty() && !tls.skip_verify {
            None
        } else {
            Some(tls)
        }
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name).map(PathBuf::from)
}

fn default_config_file() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("lattice/config.yaml");
    path.is_file().then_some(path)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
