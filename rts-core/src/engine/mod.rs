/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scheduling engines.
//!
//! An [`Engine`] owns everything one run needs: the job registry, the shared
//! [`ResourceLock`], the simulated [`Processor`] and the telemetry mirrors.
//! Nothing is global; every execution unit receives the engine context
//! explicitly.
//!
//! | Policy | Units | Priority | Miss detection |
//! |---|---|---|---|
//! | [`Policy::Edf`] | 1 dispatcher + 1 parked worker per job | dynamic (earliest deadline) | yes, per cycle |
//! | [`Policy::Rm`] | 1 self-scheduling unit per job | static, shorter period ⇒ higher | none (trusts admission) |
//!
//! # Example
//! ```rust,ignore
//! let sink = Arc::new(MemorySink::new());
//! let handle = start_edf(EngineConfig::reference(Policy::Edf), sink)?;
//! tokio::time::sleep(Duration::from_secs(2)).await;
//! handle.halt();
//! ```

pub mod edf;
pub mod error;
pub mod rm;

pub use error::EngineError;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::clock::{Clock, Millis};
use crate::event::{Event, EventKind, EventSink};
use crate::feasibility;
use crate::job::{self, JobSpec};
use crate::processor::{Priority, Processor, DEFAULT_QUANTUM};
use crate::resource::{ResourceLock, DEFAULT_RESOURCE_TIMEOUT};
use crate::telemetry::Telemetry;

use rm::PriorityTable;

/// Processor priority of EDF workers.  The dispatcher serialises them, so a
/// single level is enough.
pub const DEFAULT_EDF_PRIORITY: Priority = Priority(1);

// ── Policy ────────────────────────────────────────────────────────────────────

/// Scheduling discipline, chosen once per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Earliest Deadline First.
    Edf,
    /// Rate-Monotonic fixed priority.
    Rm,
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Edf => f.write_str("EDF"),
            Policy::Rm => f.write_str("RM"),
        }
    }
}

impl FromStr for Policy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "edf" | "e" | "1" => Ok(Policy::Edf),
            "rm" | "r" | "2" => Ok(Policy::Rm),
            _ => Err(EngineError::UnknownPolicy(s.trim().to_string())),
        }
    }
}

// ── EngineConfig ──────────────────────────────────────────────────────────────

/// Everything needed to build one engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub jobs: Vec<JobSpec>,
    /// Bounded wait for the shared resource.
    pub resource_timeout: Duration,
    /// Preemption quantum of the simulated processor.
    pub quantum: Duration,
    /// Processor priority of EDF workers (ignored by RM).
    pub edf_priority: Priority,
}

impl EngineConfig {
    /// The three-job reference configuration for `policy`.
    pub fn reference(policy: Policy) -> Self {
        let jobs = match policy {
            Policy::Edf => job::reference_edf_jobs(),
            Policy::Rm => job::reference_rm_jobs(),
        };
        Self::with_jobs(jobs)
    }

    /// Default timing parameters around a custom job set.
    pub fn with_jobs(jobs: Vec<JobSpec>) -> Self {
        Self {
            jobs,
            resource_timeout: DEFAULT_RESOURCE_TIMEOUT,
            quantum: DEFAULT_QUANTUM,
            edf_priority: DEFAULT_EDF_PRIORITY,
        }
    }
}

// ── Engine context (shared by execution units) ────────────────────────────────

/// State every execution unit of a running engine receives.
pub(crate) struct EngineContext {
    pub clock: Clock,
    pub sink: Arc<dyn EventSink>,
    pub telemetry: Arc<Telemetry>,
    pub resource: Arc<ResourceLock>,
    pub cpu: Arc<Processor>,
}

impl EngineContext {
    pub fn emit(&self, kind: EventKind, job: &str, detail: Option<Millis>) {
        let mut event = Event::new(self.clock.now_ms(), kind, job);
        if let Some(d) = detail {
            event = event.with_detail(d);
        }
        self.sink.emit(&event);
    }

    /// Drive the job's mirror high, then log START.
    pub fn mark_start(&self, slot: usize, job: &str, deadline: Option<Millis>) {
        self.telemetry.set_running(slot, true);
        self.emit(EventKind::Start, job, deadline);
    }

    /// Log COMPLETE, then drive the job's mirror low.
    pub fn mark_complete(&self, slot: usize, job: &str) {
        self.emit(EventKind::Complete, job, None);
        self.telemetry.set_running(slot, false);
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// A validated, not-yet-started engine.
///
/// Starting consumes the engine, so one value can never be started twice.
pub struct Engine {
    policy: Policy,
    config: EngineConfig,
    sink: Arc<dyn EventSink>,
    telemetry: Arc<Telemetry>,
    resource: Arc<ResourceLock>,
    cpu: Arc<Processor>,
    priorities: Option<PriorityTable>,
}

impl Engine {
    /// Validate `config` and build an engine for `policy`.
    ///
    /// The job set's schedulability is assessed and logged, but never used to
    /// reject it.
    ///
    /// # Errors
    /// Any [`EngineError`] describing why the job set or the timing parameters
    /// cannot be run.
    pub fn new(
        policy: Policy,
        config: EngineConfig,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, EngineError> {
        job::validate(&config.jobs)?;
        if config.resource_timeout.is_zero() {
            return Err(EngineError::ZeroResourceTimeout);
        }

        feasibility::log_assessment(policy, &config.jobs);

        let priorities = match policy {
            Policy::Rm => {
                let table = PriorityTable::rate_monotonic(&config.jobs);
                for (spec, prio) in config.jobs.iter().zip(table.ranks()) {
                    info!(job = %spec.name, period_ms = spec.period_ms, priority = prio.0, "RM priority");
                }
                Some(table)
            }
            Policy::Edf => None,
        };

        Ok(Self {
            policy,
            telemetry: Arc::new(Telemetry::new(config.jobs.len())),
            resource: Arc::new(ResourceLock::new(config.resource_timeout)),
            cpu: Arc::new(Processor::new(config.quantum)),
            config,
            sink,
            priorities,
        })
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn jobs(&self) -> &[JobSpec] {
        &self.config.jobs
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    pub fn resource(&self) -> Arc<ResourceLock> {
        self.resource.clone()
    }

    /// Spawn every execution unit on the current tokio runtime.
    ///
    /// The clock epoch is the instant of this call.
    pub fn start(self) -> EngineHandle {
        let clock = Clock::start();
        let ctx = Arc::new(EngineContext {
            clock,
            sink: self.sink,
            telemetry: self.telemetry.clone(),
            resource: self.resource.clone(),
            cpu: self.cpu,
        });

        info!(
            policy = %self.policy,
            jobs = self.config.jobs.len(),
            resource_timeout_ms = self.config.resource_timeout.as_millis() as u64,
            "engine starting"
        );

        let jobs = self.config.jobs;
        let tasks = match self.policy {
            Policy::Edf => edf::spawn(ctx, jobs, self.config.edf_priority),
            Policy::Rm => {
                let table = self
                    .priorities
                    .unwrap_or_else(|| PriorityTable::rate_monotonic(&jobs));
                rm::spawn(ctx, jobs, table)
            }
        };

        EngineHandle {
            policy: self.policy,
            clock,
            telemetry: self.telemetry,
            resource: self.resource,
            tasks,
        }
    }
}

/// Build and start an EDF engine.
pub fn start_edf(
    config: EngineConfig,
    sink: Arc<dyn EventSink>,
) -> Result<EngineHandle, EngineError> {
    Ok(Engine::new(Policy::Edf, config, sink)?.start())
}

/// Build and start an RM engine.
pub fn start_rm(
    config: EngineConfig,
    sink: Arc<dyn EventSink>,
) -> Result<EngineHandle, EngineError> {
    Ok(Engine::new(Policy::Rm, config, sink)?.start())
}

// ── EngineHandle ──────────────────────────────────────────────────────────────

/// A running engine.
///
/// There is no per-job shutdown: [`halt`](Self::halt), or dropping the
/// handle, stops every execution unit at once.
pub struct EngineHandle {
    policy: Policy,
    clock: Clock,
    telemetry: Arc<Telemetry>,
    resource: Arc<ResourceLock>,
    tasks: Vec<JoinHandle<()>>,
}

impl EngineHandle {
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// The engine's clock; glue tasks use it so their timestamps line up.
    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    pub fn resource(&self) -> Arc<ResourceLock> {
        self.resource.clone()
    }

    /// Immediate, total halt.
    pub fn halt(self) {
        drop(self);
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
