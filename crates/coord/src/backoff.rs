// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Exponential backoff with full jitter.

use rand::Rng;
use std::time::Duration;

/// Retry delay policy: `delay(n)` is uniform in `[0, min(max, base·factor^n)]`.
///
/// Full jitter keeps a fleet of reconnecting workers from thundering in
/// lockstep after a coordinator restart.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub factor: f64,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self { base: Duration::from_secs(1), factor: 2.0, max: Duration::from_secs(60) }
    }
}

impl BackoffPolicy {
    /// Ceiling for attempt `n` before jitter.
    pub fn cap(&self, attempt: u32) -> Duration {
        let exp = self.factor.powi(attempt.min(32) as i32);
        let raw = self.base.as_secs_f64() * exp;
        Duration::from_secs_f64(raw.min(self.max.as_secs_f64()))
    }

    /// Jittered delay for attempt `n` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let cap = self.cap(attempt);
        if cap.is_zero() {
            return cap;
        }
        rand::thread_rng().gen_range(Duration::ZERO..=cap)
    }
}
