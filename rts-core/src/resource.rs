/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The shared exclusive resource and the contention protocol both engines
//! run it under.
//!
//! # Protocol
//! ```text
//!  ├── wait ≤ timeout (off-core) ──┤── exec/2 ──┤── exec - exec/2 ──┤
//!                                   holding lock   outside the lock
//!                                   (or unprotected
//!                                    after a timeout)
//! ```
//!
//! A job never fails, retries or blocks indefinitely on the resource.  When
//! the bounded wait expires it runs its first half unprotected.  The event
//! log stays silent about that degradation; it is counted in
//! [`ContentionStats`] and reported as a `tracing` warning instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::processor::CoreGuard;

/// Default bounded wait for the resource.
pub const DEFAULT_RESOURCE_TIMEOUT: Duration = Duration::from_millis(50);

/// Outcome of one bounded acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// The first half ran inside the critical section.
    Held,
    /// The wait expired; the first half ran without the lock.
    TimedOut,
}

/// Counters of acquisition outcomes since the lock was created.
#[derive(Debug, Default)]
pub struct ContentionStats {
    acquired: AtomicU64,
    timed_out: AtomicU64,
}

impl ContentionStats {
    pub fn acquired(&self) -> u64 {
        self.acquired.load(Ordering::Relaxed)
    }

    pub fn timed_out(&self) -> u64 {
        self.timed_out.load(Ordering::Relaxed)
    }
}

/// Single system-wide mutual-exclusion resource.
#[derive(Debug)]
pub struct ResourceLock {
    mutex: Mutex<()>,
    timeout: Duration,
    stats: ContentionStats,
}

impl ResourceLock {
    pub fn new(timeout: Duration) -> Self {
        Self {
            mutex: Mutex::new(()),
            timeout,
            stats: ContentionStats::default(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn stats(&self) -> &ContentionStats {
        &self.stats
    }

    /// Try to take the lock for at most [`timeout`](Self::timeout).
    ///
    /// Returns `None` when the wait expired.
    pub async fn try_acquire(&self) -> Option<MutexGuard<'_, ()>> {
        match tokio::time::timeout(self.timeout, self.mutex.lock()).await {
            Ok(guard) => {
                self.stats.acquired.fetch_add(1, Ordering::Relaxed);
                Some(guard)
            }
            Err(_) => {
                self.stats.timed_out.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Run one activation's simulated body for `job` under the contention
    /// protocol: first half inside the lock (if obtained in time), second half
    /// outside it.  The wait itself does not occupy the CPU.
    pub async fn run_activation(
        &self,
        core: &mut CoreGuard<'_>,
        job: &str,
        exec: Duration,
    ) -> Acquisition {
        let first = exec / 2;
        let second = exec - first;

        let guard = core.off_core(self.try_acquire()).await;
        let outcome = if guard.is_some() {
            debug!(job, "resource acquired");
            Acquisition::Held
        } else {
            warn!(
                job,
                timeout_ms = self.timeout.as_millis() as u64,
                "resource wait timed out; first half runs unprotected"
            );
            Acquisition::TimedOut
        };

        core.compute(first).await;
        drop(guard);
        core.compute(second).await;

        outcome
    }
}

impl Default for ResourceLock {
    fn default() -> Self {
        Self::new(DEFAULT_RESOURCE_TIMEOUT)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{Priority, Processor, DEFAULT_QUANTUM};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tokio::time::Instant;

    const MS: Duration = Duration::from_millis(1);

    #[tokio::test(start_paused = true)]
    async fn free_lock_is_acquired_immediately() {
        let lock = ResourceLock::default();
        let t0 = Instant::now();
        assert!(lock.try_acquire().await.is_some());
        assert_eq!(t0.elapsed(), Duration::ZERO);
        assert_eq!(lock.stats().acquired(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn contended_lock_gives_up_after_exactly_the_timeout() {
        let lock = Arc::new(ResourceLock::default());
        let holder = lock.try_acquire().await;
        assert!(holder.is_some());

        let t0 = Instant::now();
        assert!(lock.try_acquire().await.is_none());
        assert_eq!(t0.elapsed(), 50 * MS);
        assert_eq!(lock.stats().timed_out(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn at_most_one_holder_at_any_instant() {
        let lock = Arc::new(ResourceLock::new(Duration::from_secs(10)));
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let (lock, inside, peak) = (lock.clone(), inside.clone(), peak.clone());
            handles.push(tokio::spawn(async move {
                let _g = lock.try_acquire().await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(5 * MS).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(lock.stats().acquired(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn activation_takes_exec_time_when_uncontended() {
        let cpu = Processor::new(DEFAULT_QUANTUM);
        let lock = ResourceLock::default();
        let t0 = Instant::now();

        let mut core = cpu.acquire(Priority(1)).await;
        let outcome = lock.run_activation(&mut core, "Task1", 40 * MS).await;

        assert_eq!(outcome, Acquisition::Held);
        assert_eq!(t0.elapsed(), 40 * MS);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_first_halves_one_holds_other_degrades() {
        // Two jobs whose first halves (150 ms and 10 ms) overlap: the second
        // waits exactly 50 ms, then runs unprotected without aborting.
        let cpu = Arc::new(Processor::new(DEFAULT_QUANTUM));
        let lock = Arc::new(ResourceLock::default());
        let t0 = Instant::now();

        let long = {
            let (cpu, lock) = (cpu.clone(), lock.clone());
            tokio::spawn(async move {
                let mut core = cpu.acquire(Priority(1)).await;
                lock.run_activation(&mut core, "long", 300 * MS).await
            })
        };
        let short = {
            let (cpu, lock) = (cpu.clone(), lock.clone());
            tokio::spawn(async move {
                tokio::time::sleep(5 * MS).await;
                let mut core = cpu.acquire(Priority(2)).await;
                let outcome = lock.run_activation(&mut core, "short", 20 * MS).await;
                (outcome, t0.elapsed())
            })
        };

        let (short_outcome, short_done) = short.await.unwrap();
        assert_eq!(short_outcome, Acquisition::TimedOut);
        // Granted at ~5 ms, waited 50 ms off-core, then 20 ms of work at top
        // priority.
        assert!(short_done >= 75 * MS && short_done <= 77 * MS, "{short_done:?}");

        assert_eq!(long.await.unwrap(), Acquisition::Held);
        assert_eq!(lock.stats().acquired(), 1);
        assert_eq!(lock.stats().timed_out(), 1);
    }
}
