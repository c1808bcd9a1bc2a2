// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

use super::*;

#[test]
fn own_pid_is_alive() {
    assert!(pid_alive(std::process::id() as i32));
}

#[test]
fn absurd_pid_is_dead() {
    assert!(!pid_alive(0));
    assert!(!pid_alive(-1));
    // PID beyond any default pid_max.
    assert!(!pid_alive(99_999_999));
}

#[test]
fn live_runs_filters_dead_pids() {
    let tracker = ProcessTracker::new();
    let me = std::process::id() as i32;
    tracker.insert("w1", DagRunId::from_string("alive"), me);
    tracker.insert("w1", DagRunId::from_string("dead"), 99_999_999);

    let live = tracker.live_runs("w1");
    assert_eq!(live.len(), 1);
    assert_eq!(live[0], "alive");
}

#[test]
fn remove_clears_entry_and_empty_name() {
    let tracker = ProcessTracker::new();
    let me = std::process::id() as i32;
    let id = DagRunId::from_string("r1");
    tracker.insert("w1", id.clone(), me);
    assert_eq!(tracker.live_runs("w1").len(), 1);

    tracker.remove("w1", &id);
    assert!(tracker.live_runs("w1").is_empty());
}

#[test]
fn live_runs_newest_first_by_id() {
    let tracker = ProcessTracker::new();
    let me = std::process::id() as i32;
    tracker.insert("w1", DagRunId::from_string("a"), me);
    tracker.insert("w1", DagRunId::from_string("b"), me);
    assert_eq!(tracker.live_runs("w1"), ["b", "a"]);
}
