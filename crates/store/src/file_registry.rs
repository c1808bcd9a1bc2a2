// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! File-backed service registry.
//!
//! One JSON file per member under `⟨stateDir⟩/registry/⟨service⟩/`; the
//! heartbeat timestamp lives inside the file. Staleness is computed by
//! readers against the TTL, so replicas in different processes agree on
//! liveness through the shared directory alone.

use crate::registry::ServiceRegistry;
use chrono::Duration;
use lx_core::{Clock, HostInfo, ServiceName, ServiceStatus, SystemClock};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

pub struct FileServiceRegistry<C: Clock = SystemClock> {
    root: PathBuf,
    ttl: Duration,
    clock: C,
}

impl FileServiceRegistry<SystemClock> {
    pub fn new(state_dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self::with_clock(state_dir, SystemClock, ttl)
    }
}

impl<C: Clock> FileServiceRegistry<C> {
    pub fn with_clock(state_dir: impl Into<PathBuf>, clock: C, ttl: Duration) -> Self {
        Self { root: state_dir.into().join("registry"), ttl, clock }
    }

    fn service_dir(&self, service: ServiceName) -> PathBuf {
        self.root.join(service.to_string())
    }

    fn member_file(&self, service: ServiceName, host: &str) -> PathBuf {
        // Hosts are `host:port`; ':' is path-safe on unix but kept out of
        // file names for portability.
        self.service_dir(service).join(format!("{}.json", host.replace(':', "_")))
    }

    fn write_member(&self, service: ServiceName, info: &HostInfo) {
        let path = self.member_file(service, &info.host);
        let write = || -> std::io::Result<()> {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            let data = serde_json::to_vec(info).map_err(std::io::Error::other)?;
            let tmp = path.with_extension("tmp");
            fs::write(&tmp, data)?;
            fs::rename(&tmp, &path)?;
            Ok(())
        };
        if let Err(e) = write() {
            warn!(host = %info.host, error = %e, "registry write failed");
        }
    }

    fn read_member(&self, service: ServiceName, host: &str) -> Option<HostInfo> {
        let data = fs::read(self.member_file(service, host)).ok()?;
        serde_json::from_slice(&data).ok()
    }
}

impl<C: Clock> ServiceRegistry for FileServiceRegistry<C> {
    fn register(&self, service: ServiceName, host: HostInfo) {
        self.write_member(service, &host);
    }

    fn unregister(&self, service: ServiceName, host: &str) {
        let path = self.member_file(service, host);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(host, error = %e, "registry unregister failed");
            }
        }
    }

    fn update_status(&self, service: ServiceName, host: &str, status: ServiceStatus) {
        if let Some(mut info) = self.read_member(service, host) {
            info.status = status;
            self.write_member(service, &info);
        }
    }

    fn heartbeat(&self, service: ServiceName, host: &str) {
        if let Some(mut info) = self.read_member(service, host) {
            info.heartbeat_at = self.clock.utc();
            self.write_member(service, &info);
        }
    }

    fn members(&self, service: ServiceName) -> Vec<HostInfo> {
        let Ok(entries) = fs::read_dir(self.service_dir(service)) else { return Vec::new() };
        let cutoff = self.clock.utc() - self.ttl;
        let mut out: Vec<HostInfo> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .filter_map(|e| {
                let data = fs::read(e.path()).ok()?;
                serde_json::from_slice::<HostInfo>(&data).ok()
            })
            .map(|mut info| {
                if info.heartbeat_at < cutoff {
                    info.status = ServiceStatus::Inactive;
                }
                info
            })
            .collect();
        out.sort_by(|a, b| a.host.cmp(&b.host));
        out
    }
}

#[cfg(test)]
#[path = "file_registry_tests.rs"]
mod tests;
