/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Single simulated CPU shared by every execution unit of an engine.
//!
//! tokio tasks have no priorities of their own, so the shared execution
//! substrate is modelled explicitly: whoever wants to *compute* must hold the
//! [`Processor`], and the processor is always granted to the highest-priority
//! unit that is waiting for it.
//!
//! ```text
//!   unit (prio 3) ──acquire──►┐
//!   unit (prio 2) ──acquire──►├──► Processor ──► one CoreGuard at a time
//!   unit (prio 1) ──acquire──►┘        ▲
//!                                      └── released at every quantum boundary
//!                                          if a higher priority is waiting
//! ```
//!
//! Simulated work advances in quanta.  Between quanta the holder checks for a
//! strictly higher-priority waiter and, if there is one, hands the CPU over
//! and queues up again (preemption).  Waits that do not consume CPU, such as
//! lock acquisition or a period sleep, are done off-core via
//! [`CoreGuard::off_core`] or by dropping the guard.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::trace;

/// Default length of one slice of simulated work.
pub const DEFAULT_QUANTUM: Duration = Duration::from_millis(1);

// ── Priority ──────────────────────────────────────────────────────────────────

/// Static execution priority.  Larger values are more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub u32);

// ── Processor ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct CoreState {
    /// Priority of the current holder, if any.
    owner: Option<Priority>,
    /// Number of units waiting at each priority.
    waiting: BTreeMap<Priority, usize>,
}

impl CoreState {
    fn highest_waiting(&self) -> Option<Priority> {
        self.waiting.keys().next_back().copied()
    }

    fn enqueue(&mut self, p: Priority) {
        *self.waiting.entry(p).or_insert(0) += 1;
    }

    fn dequeue(&mut self, p: Priority) {
        if let Some(n) = self.waiting.get_mut(&p) {
            *n -= 1;
            if *n == 0 {
                self.waiting.remove(&p);
            }
        }
    }
}

/// Priority-arbitrated simulated CPU.
#[derive(Debug)]
pub struct Processor {
    state: Mutex<CoreState>,
    released: Notify,
    quantum: Duration,
}

impl Processor {
    /// A processor with the given preemption quantum (clamped to ≥ 1 ms).
    pub fn new(quantum: Duration) -> Self {
        Self {
            state: Mutex::new(CoreState::default()),
            released: Notify::new(),
            quantum: quantum.max(Duration::from_millis(1)),
        }
    }

    pub fn quantum(&self) -> Duration {
        self.quantum
    }

    /// Wait until the CPU is granted to `priority`.
    pub async fn acquire(&self, priority: Priority) -> CoreGuard<'_> {
        self.claim(priority).await;
        CoreGuard {
            cpu: self,
            priority,
            held: true,
        }
    }

    /// `true` if a unit strictly more urgent than `priority` is waiting.
    pub fn preempt_pending(&self, priority: Priority) -> bool {
        self.lock_state()
            .highest_waiting()
            .is_some_and(|w| w > priority)
    }

    /// `true` while some unit holds the CPU.
    pub fn is_busy(&self) -> bool {
        self.lock_state().owner.is_some()
    }

    async fn claim(&self, priority: Priority) {
        let mut ticket = WaitTicket::enqueue(self, priority);
        loop {
            let notified = self.released.notified();
            tokio::pin!(notified);
            // Register for the wake-up before checking, so a release between
            // the check and the await is not lost.
            notified.as_mut().enable();

            if ticket.try_claim() {
                return;
            }
            notified.await;
        }
    }

    fn release(&self) {
        self.lock_state().owner = None;
        self.released.notify_waiters();
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, CoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Registration in the waiting set; removed on claim or when the waiting
/// future is dropped (e.g. the engine is halted mid-wait).
struct WaitTicket<'a> {
    cpu: &'a Processor,
    priority: Priority,
    queued: bool,
}

impl<'a> WaitTicket<'a> {
    fn enqueue(cpu: &'a Processor, priority: Priority) -> Self {
        cpu.lock_state().enqueue(priority);
        Self {
            cpu,
            priority,
            queued: true,
        }
    }

    fn try_claim(&mut self) -> bool {
        let mut state = self.cpu.lock_state();
        let free = state.owner.is_none();
        let first_in_line = state.highest_waiting() == Some(self.priority);
        if free && first_in_line {
            state.owner = Some(self.priority);
            state.dequeue(self.priority);
            self.queued = false;
            true
        } else {
            false
        }
    }
}

impl Drop for WaitTicket<'_> {
    fn drop(&mut self) {
        if self.queued {
            self.cpu.lock_state().dequeue(self.priority);
            // Someone of lower priority may now be first in line.
            self.cpu.released.notify_waiters();
        }
    }
}

// ── CoreGuard ─────────────────────────────────────────────────────────────────

/// Exclusive use of the [`Processor`] by one execution unit.
///
/// Dropping the guard gives the CPU back.
#[derive(Debug)]
pub struct CoreGuard<'a> {
    cpu: &'a Processor,
    priority: Priority,
    held: bool,
}

impl CoreGuard<'_> {
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Simulate `work` of CPU time, yielding to more urgent units at every
    /// quantum boundary.
    ///
    /// Wall time spent preempted does not count towards `work`.
    pub async fn compute(&mut self, work: Duration) {
        let mut remaining = work;
        while !remaining.is_zero() {
            if !self.held || self.cpu.preempt_pending(self.priority) {
                self.yield_core().await;
            }
            let slice = remaining.min(self.cpu.quantum);
            tokio::time::sleep(slice).await;
            remaining = remaining.saturating_sub(slice);
        }
    }

    /// Await `fut` without holding the CPU, then queue up for it again.
    pub async fn off_core<F: Future>(&mut self, fut: F) -> F::Output {
        self.give_back();
        let out = fut.await;
        self.cpu.claim(self.priority).await;
        self.held = true;
        out
    }

    async fn yield_core(&mut self) {
        trace!(priority = self.priority.0, "preempted");
        self.give_back();
        self.cpu.claim(self.priority).await;
        self.held = true;
    }

    fn give_back(&mut self) {
        if self.held {
            self.held = false;
            self.cpu.release();
        }
    }
}

impl Drop for CoreGuard<'_> {
    fn drop(&mut self) {
        self.give_back();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
