/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Admission-time schedulability assessment.
//!
//! # Status: warning only
//!
//! The bounds below are **computed and logged** when an engine is built.  A
//! job set that exceeds them is still run: RM simply trusts the assessment
//! (it has no runtime miss detection), while EDF verifies every cycle and
//! reports misses in the event log.
//!
//! # Theory
//! **Liu & Layland (1973)**: under Rate Monotonic priorities, `n` independent
//! periodic jobs with implicit deadlines are guaranteed schedulable on one
//! CPU if
//!
//! $$U = \sum_{i=1}^{n} \frac{C_i}{T_i} \leq n \left(2^{1/n} - 1\right)$$
//!
//! | n | Bound |
//! |---|---|
//! | 1 | 1.000 |
//! | 2 | 0.828 |
//! | 3 | 0.780 |
//! | ∞ | ln(2) ≈ 0.693 |
//!
//! **EDF** is optimal on one CPU: implicit-deadline jobs are schedulable iff
//! `U ≤ 1`.
//!
//! The reference set (40/200 + 80/500 + 120/1000) has `U = 0.48`, inside
//! both bounds.

pub mod math;

use tracing::{info, warn};

use crate::clock::Millis;
use crate::engine::Policy;
use crate::job::JobSpec;

use math::{lcm_of_slice, HyperperiodError};

// ── Public API ────────────────────────────────────────────────────────────────

/// Compute the Liu & Layland utilisation upper bound for `n` jobs.
///
/// `U_bound(n) = n × (2^(1/n) − 1)`
///
/// Returns `1.0` for `n = 1` and `0.0` for `n = 0`.
pub fn liu_layland_bound(n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let nf = n as f64;
    nf * (2.0_f64.powf(1.0 / nf) - 1.0)
}

/// Total utilisation of a job set, ignoring zero-period entries.
pub fn total_utilization(jobs: &[JobSpec]) -> f64 {
    jobs.iter()
        .filter(|j| j.period_ms > 0)
        .map(JobSpec::utilization)
        .sum()
}

/// Check the job set against the Liu & Layland bound.
///
/// Returns `None` if the set is **provably RM-schedulable**, otherwise
/// `Some(total_utilisation)`.  Exceeding the bound does not prove the set
/// unschedulable.
pub fn check_liu_layland(jobs: &[JobSpec]) -> Option<f64> {
    let n = jobs.iter().filter(|j| j.period_ms > 0).count();
    if n == 0 {
        return None;
    }

    let total_u = total_utilization(jobs);
    if total_u > liu_layland_bound(n) {
        Some(total_u)
    } else {
        None
    }
}

/// Check the job set against the EDF bound `U ≤ 1`.
///
/// Returns `Some(total_utilisation)` when the set is overloaded.
pub fn check_edf(jobs: &[JobSpec]) -> Option<f64> {
    let total_u = total_utilization(jobs);
    if total_u > 1.0 {
        Some(total_u)
    } else {
        None
    }
}

/// Hyperperiod of the job set: LCM of all distinct periods.
///
/// # Errors
/// [`HyperperiodError::NoValidPeriods`] for an empty / all-zero set and
/// [`HyperperiodError::Overflow`] when the LCM exceeds `u64`.
pub fn hyperperiod_ms(jobs: &[JobSpec]) -> Result<Millis, HyperperiodError> {
    let mut periods: Vec<Millis> = jobs
        .iter()
        .map(|j| j.period_ms)
        .filter(|&p| p > 0)
        .collect();
    periods.sort_unstable();
    periods.dedup();

    if periods.is_empty() {
        return Err(HyperperiodError::NoValidPeriods);
    }
    lcm_of_slice(&periods)
}

/// Log the assessment relevant to `policy`.  Never fails.
pub fn log_assessment(policy: Policy, jobs: &[JobSpec]) {
    let total_u = total_utilization(jobs);

    match hyperperiod_ms(jobs) {
        Ok(h) => info!(
            policy = %policy,
            jobs = jobs.len(),
            utilization = total_u,
            hyperperiod_ms = h,
            "job set assessment"
        ),
        Err(e) => warn!(policy = %policy, "hyperperiod unavailable: {e}"),
    }

    match policy {
        Policy::Rm => {
            let bound = liu_layland_bound(jobs.len());
            if let Some(u) = check_liu_layland(jobs) {
                warn!(
                    utilization = u,
                    bound,
                    "Liu & Layland bound exceeded; RM schedulability not guaranteed"
                );
            } else {
                info!(utilization = total_u, bound, "RM schedulable by Liu & Layland");
            }
        }
        Policy::Edf => {
            if let Some(u) = check_edf(jobs) {
                warn!(utilization = u, "EDF utilization above 1.0; deadline misses expected");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
