// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

use super::*;
use lx_core::FakeClock;
use std::time::Duration as StdDuration;

fn registry() -> (FakeClock, MemoryServiceRegistry<FakeClock>) {
    let clock = FakeClock::new();
    let reg = MemoryServiceRegistry::with_clock(clock.clone(), Duration::seconds(30));
    (clock, reg)
}

#[test]
fn register_and_list_members() {
    let (clock, reg) = registry();
    reg.register(ServiceName::Coordinator, HostInfo::active("a:50055", clock.utc()));
    reg.register(ServiceName::Coordinator, HostInfo::active("b:50055", clock.utc()));

    let members = reg.members(ServiceName::Coordinator);
    assert_eq!(members.len(), 2);
    assert!(members.iter().all(|m| m.status == ServiceStatus::Active));
    // Sorted by host for deterministic leadership decisions.
    assert_eq!(members[0].host, "a:50055");

    assert!(reg.members(ServiceName::Scheduler).is_empty());
}

#[test]
fn unregister_removes_member() {
    let (clock, reg) = registry();
    reg.register(ServiceName::Scheduler, HostInfo::active("a:1", clock.utc()));
    reg.unregister(ServiceName::Scheduler, "a:1");
    assert!(reg.members(ServiceName::Scheduler).is_empty());
}

#[test]
fn stale_member_reports_inactive() {
    let (clock, reg) = registry();
    reg.register(ServiceName::Coordinator, HostInfo::active("a:1", clock.utc()));

    clock.advance(StdDuration::from_secs(31));
    let members = reg.members(ServiceName::Coordinator);
    assert_eq!(members[0].status, ServiceStatus::Inactive);
}

#[test]
fn heartbeat_keeps_member_active() {
    let (clock, reg) = registry();
    reg.register(ServiceName::Coordinator, HostInfo::active("a:1", clock.utc()));

    clock.advance(StdDuration::from_secs(20));
    reg.heartbeat(ServiceName::Coordinator, "a:1");
    clock.advance(StdDuration::from_secs(20));

    // 40s since registration but only 20s since the last heartbeat.
    let members = reg.members(ServiceName::Coordinator);
    assert_eq!(members[0].status, ServiceStatus::Active);
}

#[test]
fn update_status_overrides_until_next_heartbeat_check() {
    let (clock, reg) = registry();
    reg.register(ServiceName::Scheduler, HostInfo::active("a:1", clock.utc()));
    reg.update_status(ServiceName::Scheduler, "a:1", ServiceStatus::Inactive);
    assert_eq!(reg.members(ServiceName::Scheduler)[0].status, ServiceStatus::Inactive);
}
