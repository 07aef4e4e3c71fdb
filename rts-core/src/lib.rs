/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! rts-core – periodic EDF / Rate-Monotonic scheduling core
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── clock           – monotonic millisecond clock of one engine run
//! ├── job             – job specs, registry bookkeeping, reference sets
//! ├── event           – event log records and sinks (CSV, tracing, memory)
//! ├── telemetry       – per-job "running" mirror + plot line
//! ├── processor       – priority-arbitrated simulated CPU
//! ├── resource        – shared lock with bounded wait (contention protocol)
//! ├── engine/         – EDF dispatcher + workers, RM units, lifecycle
//! ├── feasibility/    – Liu & Layland / EDF bounds, hyperperiod
//! ├── config/         – YAML workload configuration
//! └── glue            – watchdog, plot sampler, supervisor
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod event;
pub mod feasibility;
pub mod glue;
pub mod job;
pub mod processor;
pub mod resource;
pub mod telemetry;
