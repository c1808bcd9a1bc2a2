// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Service registry: liveness of coordinator and scheduler instances.

use chrono::Duration;
use lx_core::{Clock, HostInfo, ServiceName, ServiceStatus, SystemClock};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Membership table for long-running services.
///
/// A member is active iff its last heartbeat is within the TTL
/// (3× the heartbeat interval by convention).
pub trait ServiceRegistry: Send + Sync {
    fn register(&self, service: ServiceName, host: HostInfo);
    fn unregister(&self, service: ServiceName, host: &str);
    fn update_status(&self, service: ServiceName, host: &str, status: ServiceStatus);
    /// Refresh the member's heartbeat timestamp.
    fn heartbeat(&self, service: ServiceName, host: &str);
    /// Current members with staleness applied: members past the TTL are
    /// reported inactive.
    fn members(&self, service: ServiceName) -> Vec<HostInfo>;
}

/// In-memory registry for single-process deployments and tests.
pub struct MemoryServiceRegistry<C: Clock = SystemClock> {
    clock: C,
    ttl: Duration,
    members: Mutex<HashMap<ServiceName, HashMap<String, HostInfo>>>,
}

impl MemoryServiceRegistry<SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(SystemClock, ttl)
    }
}

impl<C: Clock> MemoryServiceRegistry<C> {
    pub fn with_clock(clock: C, ttl: Duration) -> Self {
        Self { clock, ttl, members: Mutex::new(HashMap::new()) }
    }
}

impl<C: Clock> ServiceRegistry for MemoryServiceRegistry<C> {
    fn register(&self, service: ServiceName, host: HostInfo) {
        self.members
            .lock()
            .entry(service)
            .or_default()
            .insert(host.host.clone(), host);
    }

    fn unregister(&self, service: ServiceName, host: &str) {
        let mut members = self.members.lock();
        if let Some(hosts) = members.get_mut(&service) {
            hosts.remove(host);
            if hosts.is_empty() {
                members.remove(&service);
            }
        }
    }

    fn update_status(&self, service: ServiceName, host: &str, status: ServiceStatus) {
        if let Some(info) =
            self.members.lock().get_mut(&service).and_then(|hosts| hosts.get_mut(host))
        {
            info.status = status;
        }
    }

    fn heartbeat(&self, service: ServiceName, host: &str) {
        if let Some(info) =
            self.members.lock().get_mut(&service).and_then(|hosts| hosts.get_mut(host))
        {
            info.heartbeat_at = self.clock.utc();
        }
    }

    fn members(&self, service: ServiceName) -> Vec<HostInfo> {
        let cutoff = self.clock.utc() - self.ttl;
        let members = self.members.lock();
        let mut out: Vec<HostInfo> = members
            .get(&service)
            .map(|hosts| hosts.values().cloned().collect())
            .unwrap_or_default();
        for info in &mut out {
            if info.heartbeat_at < cutoff {
                info.status = ServiceStatus::Inactive;
            }
        }
        out.sort_by(|a, b| a.host.cmp(&b.host));
        out
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
