/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Monotonic millisecond clock shared by every execution unit of an engine.
//!
//! Built on [`tokio::time::Instant`] so that tests running on a paused
//! runtime (`#[tokio::test(start_paused = true)]`) observe exact, repeatable
//! timestamps.

use std::time::Duration;

use tokio::time::Instant;

/// Millisecond timestamp relative to the clock's epoch.
pub type Millis = u64;

/// Monotonic millisecond counter.
///
/// The epoch is fixed when the clock is created; `now_ms()` never decreases.
/// No wraparound handling: a `u64` of milliseconds outlives any host.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    epoch: Instant,
}

impl Clock {
    /// Start a clock whose epoch is "now".
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Milliseconds elapsed since the epoch.
    pub fn now_ms(&self) -> Millis {
        self.epoch.elapsed().as_millis() as Millis
    }

    /// Convert a millisecond timestamp back into an [`Instant`] on this clock.
    pub fn instant_at(&self, ms: Millis) -> Instant {
        self.epoch + Duration::from_millis(ms)
    }
}
