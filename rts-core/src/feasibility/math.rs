/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! GCD / checked LCM over millisecond periods.

use thiserror::Error;

use crate::clock::Millis;

/// Why a job set has no hyperperiod.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HyperperiodError {
    #[error("no jobs with a valid (non-zero) period")]
    NoValidPeriods,

    /// Carries the operands so the warning says which periods blew up.
    #[error("LCM overflow computing lcm({a}, {b})")]
    Overflow { a: Millis, b: Millis },
}

/// Iterative Euclidean GCD.
pub fn gcd(mut a: Millis, mut b: Millis) -> Millis {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// `(a / gcd) * b` with the final multiplication checked.
///
/// Returns `Ok(0)` when either input is `0`.
pub fn lcm(a: Millis, b: Millis) -> Result<Millis, HyperperiodError> {
    if a == 0 || b == 0 {
        return Ok(0);
    }
    (a / gcd(a, b))
        .checked_mul(b)
        .ok_or(HyperperiodError::Overflow { a, b })
}

/// LCM of every period in the slice; `Ok(0)` for an empty slice.
pub fn lcm_of_slice(periods: &[Millis]) -> Result<Millis, HyperperiodError> {
    periods
        .iter()
        .try_fold(periods.first().copied().unwrap_or(0), |acc, &p| lcm(acc, p))
}
