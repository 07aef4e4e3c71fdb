/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Job data model shared by both scheduling engines.
//!
//! Two types model the two sides of a job's life:
//!
//! ```text
//! YAML / reference set ──► JobSpec ──(engine construction)──► Job
//!                           ↑ immutable description            ↑ mutable per-cycle bookkeeping
//! ```
//!
//! # Ownership model
//! A [`Job`] is owned by exactly one writer for its bookkeeping fields:
//! the EDF dispatcher owns `next_release`, `abs_deadline` and `ready`; the
//! RM unit owns its own `next_release`.  The `running` state lives in the
//! engine's [`Telemetry`](crate::telemetry::Telemetry) slot and is written
//! only by the job's own execution unit.

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;

use crate::clock::Millis;
use crate::engine::EngineError;

// ── JobSpec (immutable description) ──────────────────────────────────────────

/// Immutable description of a periodic job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobSpec {
    /// Stable identifier, unique within one registry.
    pub name: String,

    /// Nominal inter-release interval in ms.
    pub period_ms: Millis,

    /// Nominal simulated execution time in ms.
    pub exec_ms: Millis,

    /// First release, relative to engine start.  Used by EDF only; RM units
    /// all start at the same instant.
    #[serde(default)]
    pub offset_ms: Millis,
}

impl JobSpec {
    pub fn new(name: impl Into<String>, period_ms: Millis, exec_ms: Millis) -> Self {
        Self {
            name: name.into(),
            period_ms,
            exec_ms,
            offset_ms: 0,
        }
    }

    /// Builder-style initial release offset.
    pub fn with_offset(mut self, offset_ms: Millis) -> Self {
        self.offset_ms = offset_ms;
        self
    }

    /// CPU utilisation fraction: `exec_ms / period_ms`.
    ///
    /// Returns `0.0` when `period_ms` is zero to avoid division by zero.
    pub fn utilization(&self) -> f64 {
        if self.period_ms == 0 {
            0.0
        } else {
            self.exec_ms as f64 / self.period_ms as f64
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn exec(&self) -> Duration {
        Duration::from_millis(self.exec_ms)
    }
}

// ── Reference job sets ───────────────────────────────────────────────────────

/// Periods of the three reference jobs, shortest first.
const REFERENCE_PERIODS_MS: [Millis; 3] = [200, 500, 1_000];
/// Execution budgets of the three reference jobs.
const REFERENCE_EXEC_MS: [Millis; 3] = [40, 80, 120];
/// Staggered first releases of the EDF reference jobs.
const REFERENCE_EDF_OFFSETS_MS: [Millis; 3] = [10, 20, 30];

/// The three-job reference set for the EDF engine (staggered releases).
pub fn reference_edf_jobs() -> Vec<JobSpec> {
    (0..3)
        .map(|i| {
            JobSpec::new(
                format!("Task{}", i + 1),
                REFERENCE_PERIODS_MS[i],
                REFERENCE_EXEC_MS[i],
            )
            .with_offset(REFERENCE_EDF_OFFSETS_MS[i])
        })
        .collect()
}

/// The three-job reference set for the RM engine (common start instant).
pub fn reference_rm_jobs() -> Vec<JobSpec> {
    (0..3)
        .map(|i| {
            JobSpec::new(
                format!("Task{}", i + 1),
                REFERENCE_PERIODS_MS[i],
                REFERENCE_EXEC_MS[i],
            )
        })
        .collect()
}

/// Reject job sets no engine can run.
///
/// # Errors
/// * [`EngineError::NoJobs`] for an empty set.
/// * [`EngineError::EmptyJobName`] / [`EngineError::DuplicateJobName`] when
///   names are not unique identifiers.
/// * [`EngineError::ZeroPeriod`] when a job could never advance its release.
pub fn validate(specs: &[JobSpec]) -> Result<(), EngineError> {
    if specs.is_empty() {
        return Err(EngineError::NoJobs);
    }

    let mut seen = HashSet::new();
    for spec in specs {
        if spec.name.trim().is_empty() {
            return Err(EngineError::EmptyJobName);
        }
        if !seen.insert(spec.name.as_str()) {
            return Err(EngineError::DuplicateJobName {
                job: spec.name.clone(),
            });
        }
        if spec.period_ms == 0 {
            return Err(EngineError::ZeroPeriod {
                job: spec.name.clone(),
            });
        }
    }
    Ok(())
}

// ── Job (mutable bookkeeping) ────────────────────────────────────────────────

/// One entry of an engine's job registry.
#[derive(Debug, Clone)]
pub struct Job {
    pub spec: JobSpec,

    /// Registry index; also the job's telemetry slot.
    pub slot: usize,

    /// Timestamp of the next scheduled release.  Advances by exactly one
    /// period per cycle.
    pub next_release: Millis,

    /// Deadline of the current activation (EDF: set at release).
    pub abs_deadline: Millis,

    /// EDF only: released and not yet completed.
    pub ready: bool,
}

impl Job {
    /// Registry entry whose first release is `first_release`.
    pub fn new(spec: JobSpec, slot: usize, first_release: Millis) -> Self {
        Self {
            spec,
            slot,
            next_release: first_release,
            abs_deadline: first_release,
            ready: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Mark the job released and compute its absolute deadline.
    ///
    /// `abs_deadline = next_release + period_ms`.
    pub fn release(&mut self) {
        self.ready = true;
        self.abs_deadline = self.next_release + self.spec.period_ms;
    }

    /// Advance `next_release` by exactly one period.
    pub fn advance(&mut self) {
        self.next_release += self.spec.period_ms;
    }

    /// `true` when the job is not ready and its release instant has passed.
    pub fn is_due(&self, now: Millis) -> bool {
        !self.ready && self.next_release <= now
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
