/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Rate-Monotonic: one self-scheduling unit per job at a fixed priority.
//!
//! Each unit loops START → contention protocol → COMPLETE → sleep until the
//! next *scheduled* release.  The release instant is always the previous
//! release plus one period, never "now plus one period", so execution jitter
//! does not shift a job's phase.  There is no runtime miss detection: RM
//! relies on the admission-time assessment logged by
//! [`feasibility`](crate::feasibility).

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::sleep_until;
use tracing::{debug, info};

use super::EngineContext;
use crate::clock::Millis;
use crate::job::{Job, JobSpec};
use crate::processor::Priority;

// ── PriorityTable ─────────────────────────────────────────────────────────────

/// Immutable registry index → priority mapping.
///
/// Built once at engine construction.  Distinct periods are ranked so that a
/// strictly shorter period always gets a strictly higher priority; jobs that
/// share a period share a level.  The lowest level is `Priority(1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityTable {
    ranks: Vec<Priority>,
}

impl PriorityTable {
    pub fn rate_monotonic(specs: &[JobSpec]) -> Self {
        let mut periods: Vec<Millis> = specs.iter().map(|s| s.period_ms).collect();
        periods.sort_unstable();
        periods.dedup();

        let levels = periods.len() as u32;
        let ranks = specs
            .iter()
            .map(|s| {
                let shorter = periods.partition_point(|&p| p < s.period_ms) as u32;
                Priority(levels - shorter)
            })
            .collect();

        Self { ranks }
    }

    /// Priority of the job at registry index `index`.
    pub fn priority(&self, index: usize) -> Option<Priority> {
        self.ranks.get(index).copied()
    }

    pub fn ranks(&self) -> &[Priority] {
        &self.ranks
    }
}

// ── Unit ──────────────────────────────────────────────────────────────────────

async fn unit(ctx: Arc<EngineContext>, mut job: Job, priority: Priority) {
    loop {
        let mut core = ctx.cpu.acquire(priority).await;
        ctx.mark_start(job.slot, job.name(), None);

        ctx.resource
            .run_activation(&mut core, job.name(), job.spec.exec())
            .await;

        ctx.mark_complete(job.slot, job.name());
        drop(core);

        job.advance();
        debug!(job = %job.name(), next_release = job.next_release, "sleeping until next period");
        sleep_until(ctx.clock.instant_at(job.next_release)).await;
    }
}

/// Spawn one unit per job, all released at the engine's start instant.
pub(crate) fn spawn(
    ctx: Arc<EngineContext>,
    specs: Vec<JobSpec>,
    table: PriorityTable,
) -> Vec<JoinHandle<()>> {
    specs
        .into_iter()
        .enumerate()
        .map(|(index, spec)| {
            let priority = table.priority(index).unwrap_or(Priority(1));
            info!(
                job = %spec.name,
                period_ms = spec.period_ms,
                exec_ms = spec.exec_ms,
                priority = priority.0,
                "RM job registered"
            );
            tokio::spawn(unit(ctx.clone(), Job::new(spec, index, 0), priority))
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
