// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Shared wiring for every sub-command.

use crate::config::Config;
use anyhow::Context as _;
use lx_coord::{BackoffPolicy, CoordinatorClient};
use lx_exec::{CmdBuilder, RunManager};
use lx_store::{FileQueueStore, FileRunStore, FileServiceRegistry, QueueStore, ServiceRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct Context {
    pub config: Config,
    pub quiet: bool,
    pub run_store: Arc<FileRunStore>,
    pub queue_store: Arc<dyn QueueStore>,
}

impl Context {
    pub fn resolve(config_path: Option<PathBuf>, quiet: bool) -> anyhow::Result<Self> {
        let config = Config::load(config_path)?;
        std::fs::create_dir_all(&config.state_dir)
            .with_context(|| format!("creating state dir {}", config.state_dir.display()))?;
        let run_store = Arc::new(FileRunStore::new(&config.state_dir));
        let queue_store: Arc<dyn QueueStore> = Arc::new(FileQueueStore::new(&config.state_dir));
        Ok(Self { config, quiet, run_store, queue_store })
    }

    /// Run manager spawning this same binary.
    pub fn manager(&self) -> anyhow::Result<Arc<RunManager>> {
        let bin = std::env::current_exe().context("locating the lattice binary")?;
        let mut builder = CmdBuilder::new(bin);
        if let Some(config) = &self.config.config_path {
            builder = builder.with_config(config);
        }
        Ok(Arc::new(RunManager::new(
            builder,
            Arc::clone(&self.run_store) as _,
            self.config.state_dir.clone(),
        )))
    }

    pub fn coordinator_clients(&self) -> Vec<Arc<CoordinatorClient>> {
        self.config
            .coordinator
            .endpoints
            .iter()
            .map(|endpoint| {
                let mut client =
                    CoordinatorClient::new(endpoint.clone()).with_policy(BackoffPolicy::default());
                if let Some(tls) = self.config.tls_config() {
                    client = client.with_tls(tls);
                }
                Arc::new(client)
            })
            .collect()
    }

    pub fn dispatch_client(&self) -> Arc<CoordinatorClient> {
        let mut client = CoordinatorClient::new(self.config.dispatch_endpoint().to_string());
        if let Some(tls) = self.config.tls_config() {
            client = client.with_tls(tls);
        }
        Arc::new(client)
    }

    pub fn registry(&self) -> Arc<dyn ServiceRegistry> {
        // TTL is 3× the worker heartbeat interval by convention.
        let ttl = chrono::Duration::seconds(
            (self.config.worker.heartbeat_interval_secs as i64).saturating_mul(3).max(15),
        );
        Arc::new(FileServiceRegistry::new(&self.config.state_dir, ttl))
    }
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(term) => term,
                Err(e) => {
                    tracing::warn!(error = %e, "sigterm handler unavailable");
                    let _ = ctrl_c.await;
                    trigger.cancel();
                    return;
                }
            };
            tokio::select! {
                _ = ctrl_c => {}
                _ = term.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }
        trigger.cancel();
    });
    cancel
}
