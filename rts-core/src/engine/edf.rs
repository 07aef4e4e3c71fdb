/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Earliest Deadline First: one dispatcher plus one parked worker per job.
//!
//! ```text
//!            ┌──────────── Dispatcher (owns next_release / abs_deadline / ready) ───────────┐
//!            │ release due jobs ─► pick min abs_deadline ─► wake worker ─► wait done | give-up │
//!            │        ▲                                                      │                 │
//!            │        └──── advance next_release, MISS if now > deadline ◄───┘                 │
//!            └───────────────────────────────┬───────────────────────────────────────────────┘
//!                                   Activation│(deadline, done)
//!                                            ▼
//!                       Worker: START ─► contention protocol ─► COMPLETE ─► done.send()
//! ```
//!
//! The dispatcher/worker rendezvous is a per-activation `oneshot` channel;
//! the give-up bound is a `timeout_at` on it.  A worker that outlives its
//! give-up bound keeps its completion receiver parked in the dispatcher, so
//! it is never woken a second time before the previous activation completes.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout_at};
use tracing::{debug, info};

use super::EngineContext;
use crate::clock::Millis;
use crate::event::EventKind;
use crate::job::{Job, JobSpec};
use crate::processor::Priority;

// ── Selection ─────────────────────────────────────────────────────────────────

/// Index of the ready job with the smallest `abs_deadline`.
///
/// Exact ties go to the lowest index (registry order, first match wins).
/// Returns `None` when no job is ready.
pub fn select_earliest<'a>(jobs: impl IntoIterator<Item = &'a Job>) -> Option<usize> {
    let mut best: Option<(usize, Millis)> = None;
    for (i, job) in jobs.into_iter().enumerate() {
        if !job.ready {
            continue;
        }
        if best.map_or(true, |(_, d)| job.abs_deadline < d) {
            best = Some((i, job.abs_deadline));
        }
    }
    best.map(|(i, _)| i)
}

// ── Dispatcher ────────────────────────────────────────────────────────────────

/// One dispatch request: the worker runs one activation and signals `done`.
#[derive(Debug)]
struct Activation {
    abs_deadline: Millis,
    done: oneshot::Sender<()>,
}

/// Dispatcher-side view of one registry entry.
struct Slot {
    job: Job,
    wake: mpsc::Sender<Activation>,
    /// Completion signal of an activation that outlived its give-up bound.
    pending: Option<oneshot::Receiver<()>>,
}

struct Dispatcher {
    ctx: Arc<EngineContext>,
    slots: Vec<Slot>,
}

impl Dispatcher {
    async fn run(mut self) {
        loop {
            self.step().await;
        }
    }

    /// One pass of the control loop.
    async fn step(&mut self) {
        self.collect_late_completions();

        let now = self.ctx.clock.now_ms();
        self.release_due(now);

        match select_earliest(self.slots.iter().map(|s| &s.job)) {
            Some(i) => self.dispatch(i).await,
            None => self.idle().await,
        }
    }

    /// Clear `ready` for workers that finished after their give-up bound.
    fn collect_late_completions(&mut self) {
        for slot in &mut self.slots {
            let finished = match slot.pending.as_mut() {
                Some(rx) => !matches!(rx.try_recv(), Err(oneshot::error::TryRecvError::Empty)),
                None => false,
            };
            if finished {
                slot.pending = None;
                slot.job.ready = false;
            }
        }
    }

    fn release_due(&mut self, now: Millis) {
        for slot in &mut self.slots {
            if slot.job.is_due(now) {
                slot.job.release();
                self.ctx.emit(
                    EventKind::Release,
                    slot.job.name(),
                    Some(slot.job.abs_deadline),
                );
            }
        }
    }

    /// Run the selected job until it completes or the give-up bound passes.
    ///
    /// The cycle of a release ends once: at the first completion or give-up.
    /// Only then is `next_release` advanced and the miss check made.  A job
    /// re-selected while its late activation is still running just waits on
    /// that activation again.
    async fn dispatch(&mut self, i: usize) {
        let selected_at = self.ctx.clock.now_ms();
        // Given up once the clock strictly exceeds `selected_at + period`.
        let give_up = self
            .ctx
            .clock
            .instant_at(selected_at + self.slots[i].job.spec.period_ms + 1);
        let slot = &mut self.slots[i];

        debug!(
            job = %slot.job.name(),
            abs_deadline = slot.job.abs_deadline,
            "dispatch"
        );

        let (mut done, overrun) = match slot.pending.take() {
            Some(rx) => (rx, true),
            None => {
                let (tx, rx) = oneshot::channel();
                let activation = Activation {
                    abs_deadline: slot.job.abs_deadline,
                    done: tx,
                };
                // A closed channel drops `tx`, which reads as completion below.
                let _ = slot.wake.send(activation).await;
                (rx, false)
            }
        };

        match timeout_at(give_up, &mut done).await {
            Ok(_) => slot.job.ready = false,
            Err(_) => {
                debug!(job = %slot.job.name(), "give-up bound reached");
                slot.pending = Some(done);
            }
        }

        if overrun {
            return;
        }

        slot.job.advance();

        if self.ctx.clock.now_ms() > slot.job.abs_deadline {
            self.ctx
                .emit(EventKind::Miss, slot.job.name(), Some(slot.job.abs_deadline));
        }
    }

    /// Nothing ready: sleep until the earliest upcoming release.
    async fn idle(&self) {
        if let Some(next) = self.slots.iter().map(|s| s.job.next_release).min() {
            sleep_until(self.ctx.clock.instant_at(next)).await;
        }
    }
}

// ── Worker ────────────────────────────────────────────────────────────────────

async fn worker(
    ctx: Arc<EngineContext>,
    spec: JobSpec,
    slot: usize,
    priority: Priority,
    mut wake: mpsc::Receiver<Activation>,
) {
    while let Some(activation) = wake.recv().await {
        let mut core = ctx.cpu.acquire(priority).await;
        ctx.mark_start(slot, &spec.name, Some(activation.abs_deadline));

        ctx.resource
            .run_activation(&mut core, &spec.name, spec.exec())
            .await;

        ctx.mark_complete(slot, &spec.name);
        drop(core);
        let _ = activation.done.send(());
    }
}

// ── Spawn ─────────────────────────────────────────────────────────────────────

/// Spawn one worker per job and return the (not yet running) dispatcher.
fn spawn_workers(
    ctx: Arc<EngineContext>,
    specs: Vec<JobSpec>,
    priority: Priority,
) -> (Dispatcher, Vec<JoinHandle<()>>) {
    let mut tasks = Vec::with_capacity(specs.len() + 1);
    let mut slots = Vec::with_capacity(specs.len());

    for (index, spec) in specs.into_iter().enumerate() {
        info!(
            job = %spec.name,
            period_ms = spec.period_ms,
            exec_ms = spec.exec_ms,
            first_release_ms = spec.offset_ms,
            "EDF job registered"
        );
        let (tx, rx) = mpsc::channel(1);
        tasks.push(tokio::spawn(worker(
            ctx.clone(),
            spec.clone(),
            index,
            priority,
            rx,
        )));
        let first_release = spec.offset_ms;
        slots.push(Slot {
            job: Job::new(spec, index, first_release),
            wake: tx,
            pending: None,
        });
    }

    (Dispatcher { ctx, slots }, tasks)
}

/// Spawn the dispatcher and one worker per job.
pub(crate) fn spawn(
    ctx: Arc<EngineContext>,
    specs: Vec<JobSpec>,
    priority: Priority,
) -> Vec<JoinHandle<()>> {
    let (dispatcher, mut tasks) = spawn_workers(ctx, specs, priority);
    tasks.push(tokio::spawn(dispatcher.run()));
    tasks
}

// ── Tests ─────────────────────────────────────────────────────────────────────
