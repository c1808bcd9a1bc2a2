// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

use super::*;
use lx_core::FakeClock;
use proptest::prelude::*;
use std::time::Duration;

fn run(name: &str, id: &str) -> DagRunRef {
    DagRunRef::new(name, id)
}

#[test]
fn fifo_within_priority_class() {
    let store = MemoryQueueStore::new();
    store.enqueue("q1", Priority::Low, run("w1", "r1")).unwrap();
    store.enqueue("q1", Priority::Low, run("w1", "r2")).unwrap();
    store.enqueue("q1", Priority::Low, run("w1", "r3")).unwrap();

    let order: Vec<String> = (0..3)
        .map(|_| store.dequeue_by_name("q1").unwrap().dag_run.id.to_string())
        .collect();
    assert_eq!(order, ["r1", "r2", "r3"]);
}

#[test]
fn high_priority_jumps_older_low() {
    let clock = FakeClock::new();
    let store = MemoryQueueStore::with_clock(clock.clone());
    store.enqueue("q1", Priority::Low, run("w1", "r1")).unwrap();
    clock.advance(Duration::from_millis(5));
    store.enqueue("q1", Priority::High, run("w1", "r2")).unwrap();

    assert_eq!(store.dequeue_by_name("q1").unwrap().dag_run.id, "r2");
    assert_eq!(store.dequeue_by_name("q1").unwrap().dag_run.id, "r1");
}

#[test]
fn same_millisecond_preserves_enqueue_order() {
    let clock = FakeClock::new();
    let store = MemoryQueueStore::with_clock(clock);
    for i in 0..10 {
        store.enqueue("q1", Priority::Low, run("w1", &format!("r{i}"))).unwrap();
    }
    for i in 0..10 {
        assert_eq!(store.dequeue_by_name("q1").unwrap().dag_run.id, format!("r{i}").as_str());
    }
}

#[test]
fn empty_queue_returns_sentinel() {
    let store = MemoryQueueStore::new();
    let err = store.dequeue_by_name("nope").unwrap_err();
    assert!(err.is_queue_empty());

    store.enqueue("q1", Priority::Low, run("w1", "r1")).unwrap();
    store.dequeue_by_name("q1").unwrap();
    assert!(store.dequeue_by_name("q1").unwrap_err().is_queue_empty());
}

#[test]
fn dequeue_by_run_removes_all_matches_and_is_idempotent() {
    let store = MemoryQueueStore::new();
    store.enqueue("q1", Priority::Low, run("w1", "r1")).unwrap();
    store.enqueue("q1", Priority::High, run("w1", "r1")).unwrap();
    store.enqueue("q1", Priority::Low, run("w1", "r2")).unwrap();

    let removed = store.dequeue_by_run("q1", &run("w1", "r1")).unwrap();
    assert_eq!(removed.len(), 2);
    assert_eq!(store.len("q1"), 1);

    // Second application is a no-op.
    let removed = store.dequeue_by_run("q1", &run("w1", "r1")).unwrap();
    assert!(removed.is_empty());
    assert_eq!(store.len("q1"), 1);
}

#[test]
fn list_and_queue_list_views() {
    let store = MemoryQueueStore::new();
    store.enqueue("qa", Priority::Low, run("w1", "r1")).unwrap();
    store.enqueue("qb", Priority::Low, run("w2", "r2")).unwrap();
    store.enqueue("qb", Priority::Low, run("w3", "r3")).unwrap();

    assert_eq!(store.queue_list(), ["qa", "qb"]);
    assert_eq!(store.list("qb").len(), 2);
    assert_eq!(store.list_by_dag_name("qb", "w3").len(), 1);
    assert_eq!(store.all().len(), 3);

    // Draining a queue drops it from the listing.
    store.dequeue_by_name("qa").unwrap();
    assert_eq!(store.queue_list(), ["qb"]);
}

#[tokio::test]
async fn watcher_sees_enqueue_and_remove() {
    let store = MemoryQueueStore::new();
    let mut rx = store.watch();

    store.enqueue("q1", Priority::Low, run("w1", "r1")).unwrap();
    store.dequeue_by_name("q1").unwrap();

    assert_eq!(rx.recv().await.unwrap(), QueueEvent::Enqueued { queue: "q1".to_string() });
    assert_eq!(rx.recv().await.unwrap(), QueueEvent::Removed { queue: "q1".to_string() });
}

proptest! {
    // Drain order always respects (priority desc, enqueuedAt asc, seq asc).
    #[test]
    fn drain_respects_global_order(priorities in prop::collection::vec(any::<bool>(), 1..40)) {
        let store = MemoryQueueStore::new();
        for (i, high) in priorities.iter().enumerate() {
            let p = if *high { Priority::High } else { Priority::Low };
            store.enqueue("q", p, run("w", &format!("r{i}"))).unwrap();
        }

        let mut drained = Vec::new();
        while let Ok(item) = store.dequeue_by_name("q") {
            drained.push(item);
        }
        prop_assert_eq!(drained.len(), priorities.len());
        for pair in drained.windows(2) {
            prop_assert_ne!(pair[0].dequeue_order(&pair[1]), std::cmp::Ordering::Greater);
        }
    }
}
