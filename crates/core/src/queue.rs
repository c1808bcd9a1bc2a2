// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Queued-run model shared by the queue store and the queue scheduler.

use crate::run::DagRunRef;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Priority class of a queued run. High drains before low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Low,
}

crate::simple_display! {
    Priority {
        High => "high",
        Low => "low",
    }
}

/// One pending run in a named queue.
///
/// `seq` is assigned by the queue store at enqueue time and breaks ties
/// between items enqueued in the same millisecond.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedItem {
    pub dag_run: DagRunRef,
    pub priority: Priority,
    pub enqueued_at_ms: u64,
    pub seq: u64,
}

impl QueuedItem {
    /// Dequeue order: priority high before low, then oldest first, then
    /// enqueue sequence.
    pub fn dequeue_order(&self, other: &Self) -> Ordering {
        let class = |p: Priority| match p {
            Priority::High => 0,
            Priority::Low => 1,
        };
        class(self.priority)
            .cmp(&class(other.priority))
            .then(self.enqueued_at_ms.cmp(&other.enqueued_at_ms))
            .then(self.seq.cmp(&other.seq))
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
