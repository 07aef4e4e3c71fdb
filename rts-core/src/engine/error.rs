/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error type for engine construction.
//!
//! Errors only exist *before* an engine starts.  Once running, job-level
//! conditions (lock timeouts, deadline misses) are handled inside the job's
//! own cycle and surface solely through the event log.

use thiserror::Error;

/// Reasons an engine refuses to be built.
///
/// | Variant | Cause |
/// |---|---|
/// | `NoJobs` | empty registry |
/// | `EmptyJobName` / `DuplicateJobName` | names are not unique identifiers |
/// | `ZeroPeriod` | a job could never advance its release |
/// | `ZeroResourceTimeout` | the bounded wait would never succeed under contention |
/// | `UnknownPolicy` | mode string is neither EDF nor RM |
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("no jobs provided: the job registry is empty")]
    NoJobs,

    #[error("job name must not be empty")]
    EmptyJobName,

    #[error("duplicate job name '{job}': names must be unique within a registry")]
    DuplicateJobName { job: String },

    #[error("job '{job}' has a zero period")]
    ZeroPeriod { job: String },

    #[error("resource timeout must be greater than zero")]
    ZeroResourceTimeout,

    #[error("unknown scheduling policy: '{0}' (valid: edf, rm)")]
    UnknownPolicy(String),
}
