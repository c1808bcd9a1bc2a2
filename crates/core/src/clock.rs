// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Wall-clock source for the execution plane.
//!
//! Everything time-dependent here is wall-clock driven: queue ordering keys,
//! heartbeat staleness, cron evaluation windows, and status timestamps all
//! derive from one epoch-millisecond reading. Components take a [`Clock`]
//! type parameter so TTL and catch-up logic is testable without sleeping.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the current wall-clock time.
pub trait Clock: Clone + Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn epoch_ms(&self) -> u64;

    /// The same reading as [`Clock::epoch_ms`], as a UTC timestamp.
    fn utc(&self) -> DateTime<Utc> {
        let ms = self.epoch_ms() as i64;
        Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
    }
}

/// Real system clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Manually advanced clock for tests.
///
/// Clones share the same underlying counter, so a fixture and the component
/// under test observe identical time.
#[derive(Clone)]
pub struct FakeClock {
    epoch_ms: Arc<AtomicU64>,
}

impl FakeClock {
    /// Starts at an arbitrary fixed instant (2023-11-14T22:13:20Z); tests
    /// that care about absolute time pin it with [`FakeClock::set_epoch_ms`].
    pub fn new() -> Self {
        Self { epoch_ms: Arc::new(AtomicU64::new(1_700_000_000_000)) }
    }

    pub fn advance(&self, duration: Duration) {
        self.epoch_ms.fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_epoch_ms(&self, ms: u64) {
        self.epoch_ms.store(ms, Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn epoch_ms(&self) -> u64 {
        self.epoch_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
