/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-job timing metrics computed from an rts-core CSV event log.
//!
//! Pairing rule: each `START` (or `RELEASE`) is matched with the earliest
//! not-yet-used `COMPLETE` of the same job whose timestamp is not earlier.
//! Execution time is `COMPLETE - START`, response time `COMPLETE - RELEASE`.
//! RM logs carry no `RELEASE` records, so their response time is absent.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use rts_core::clock::Millis;
use rts_core::event::{Event, EventKind};

/// Names in the log that are not scheduled jobs.
pub const NON_JOB_NAMES: [&str; 3] = ["WDT", "INFO", "Supervisor"];

// ── Parsing ───────────────────────────────────────────────────────────────────

/// A parsed log: every event that could be read, plus how many lines were
/// not events (telemetry plot lines, boot noise...).
#[derive(Debug, Default)]
pub struct ParsedLog {
    pub events: Vec<Event>,
    pub skipped: usize,
}

/// Read events from `reader`, skipping lines that are not event records.
pub fn parse_log(reader: impl BufRead) -> Result<ParsedLog> {
    let mut log = ParsedLog::default();
    for (n, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Cannot read log line {}", n + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        match Event::parse_csv(&line) {
            Ok(event) => log.events.push(event),
            Err(e) => {
                debug!(line = n + 1, "skipping: {e}");
                log.skipped += 1;
            }
        }
    }
    Ok(log)
}

/// Open and parse the log at `path`.
pub fn load_log(path: &Path) -> Result<ParsedLog> {
    info!("Reading event log: {}", path.display());
    let file =
        File::open(path).with_context(|| format!("Cannot open event log: {}", path.display()))?;
    parse_log(BufReader::new(file))
        .with_context(|| format!("Failed to parse event log: {}", path.display()))
}

// ── Metrics ───────────────────────────────────────────────────────────────────

/// Summary metrics of one job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobMetrics {
    pub job: String,
    pub avg_exec_ms: Option<f64>,
    pub avg_response_ms: Option<f64>,
    /// `MISS` count over `max(1, RELEASE count)`.
    pub miss_ratio: f64,
    pub total_exec_ms: Millis,
    /// Shortest and longest execution sample.
    pub exec_range_ms: Option<(Millis, Millis)>,
    /// Fraction of all jobs' execution time spent in this job.
    pub cpu_share: f64,
    pub release_count: usize,
}

/// Durations from each `origin` to its paired completion.
fn pair_with_completions(origins: &[Millis], completes: &[Millis]) -> Vec<Millis> {
    let mut used = vec![false; completes.len()];
    let mut out = Vec::with_capacity(origins.len());
    for &o in origins {
        let found = completes
            .iter()
            .enumerate()
            .find(|&(i, &c)| !used[i] && c >= o)
            .map(|(i, &c)| (i, c));
        if let Some((i, c)) = found {
            used[i] = true;
            out.push(c - o);
        }
    }
    out
}

fn mean(samples: &[Millis]) -> Option<f64> {
    if samples.is_empty() {
        None
    } else {
        Some(samples.iter().sum::<Millis>() as f64 / samples.len() as f64)
    }
}

/// Job names in order of first appearance, non-job names excluded.
fn job_names(events: &[Event]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for e in events {
        if !NON_JOB_NAMES.contains(&e.job.as_str()) && !names.contains(&e.job.as_str()) {
            names.push(&e.job);
        }
    }
    names
}

/// Metrics for every job found in `events`.
pub fn analyze(events: &[Event]) -> Vec<JobMetrics> {
    let mut jobs = analyze_jobs(events);
    let total: Millis = jobs.iter().map(|j| j.total_exec_ms).sum();
    if total > 0 {
        for j in &mut jobs {
            j.cpu_share = j.total_exec_ms as f64 / total as f64;
        }
    }
    jobs
}

fn analyze_jobs(events: &[Event]) -> Vec<JobMetrics> {
    let mut sorted: Vec<&Event> = events.iter().collect();
    sorted.sort_by_key(|e| e.timestamp_ms);

    job_names(events)
        .into_iter()
        .map(|job| {
            let times = |kind: EventKind| -> Vec<Millis> {
                sorted
                    .iter()
                    .filter(|e| e.job == job && e.kind == kind)
                    .map(|e| e.timestamp_ms)
                    .collect()
            };
            let starts = times(EventKind::Start);
            let completes = times(EventKind::Complete);
            let releases = times(EventKind::Release);
            let misses = times(EventKind::Miss).len();

            let execs = pair_with_completions(&starts, &completes);
            let responses = pair_with_completions(&releases, &completes);

            JobMetrics {
                job: job.to_string(),
                avg_exec_ms: mean(&execs),
                avg_response_ms: mean(&responses),
                miss_ratio: misses as f64 / releases.len().max(1) as f64,
                total_exec_ms: execs.iter().sum(),
                exec_range_ms: execs
                    .iter()
                    .min()
                    .copied()
                    .zip(execs.iter().max().copied()),
                cpu_share: 0.0,
                release_count: releases.len(),
            }
        })
        .collect()
}

/// Mean interval between watchdog heartbeats; `None` with fewer than two.
pub fn watchdog_interval(events: &[Event]) -> Option<f64> {
    let mut pets: Vec<Millis> = events
        .iter()
        .filter(|e| e.job == "WDT")
        .map(|e| e.timestamp_ms)
        .collect();
    if pets.len() < 2 {
        return None;
    }
    pets.sort_unstable();
    let span = pets[pets.len() - 1] - pets[0];
    Some(span as f64 / (pets.len() - 1) as f64)
}

// ── Report ────────────────────────────────────────────────────────────────────

/// Everything printed for one log.
#[derive(Debug)]
pub struct LogReport {
    pub label: String,
    pub jobs: Vec<JobMetrics>,
    pub watchdog_interval_ms: Option<f64>,
}

impl LogReport {
    pub fn from_events(label: impl Into<String>, events: &[Event]) -> Self {
        Self {
            label: label.into(),
            jobs: analyze(events),
            watchdog_interval_ms: watchdog_interval(events),
        }
    }

    /// Mean of the per-job average response times that exist.
    pub fn mean_response_ms(&self) -> Option<f64> {
        let known: Vec<f64> = self.jobs.iter().filter_map(|j| j.avg_response_ms).collect();
        if known.is_empty() {
            None
        } else {
            Some(known.iter().sum::<f64>() / known.len() as f64)
        }
    }

    pub fn mean_miss_ratio(&self) -> Option<f64> {
        if self.jobs.is_empty() {
            None
        } else {
            Some(self.jobs.iter().map(|j| j.miss_ratio).sum::<f64>() / self.jobs.len() as f64)
        }
    }
}

fn opt(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".to_string(), |x| format!("{x:.2}"))
}

impl fmt::Display for LogReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "===== {} METRICS =====", self.label)?;
        writeln!(
            f,
            "{:<12} {:>10} {:>10} {:>8} {:>10} {:>9} {:>7} {:>11}",
            "job", "avg_exec", "avg_resp", "miss", "total_exec", "releases", "cpu%", "exec_range"
        )?;
        for j in &self.jobs {
            writeln!(
                f,
                "{:<12} {:>10} {:>10} {:>8.3} {:>10} {:>9} {:>7.1} {:>11}",
                j.job,
                opt(j.avg_exec_ms),
                opt(j.avg_response_ms),
                j.miss_ratio,
                j.total_exec_ms,
                j.release_count,
                j.cpu_share * 100.0,
                j.exec_range_ms
                    .map_or_else(|| "n/a".to_string(), |(lo, hi)| format!("{lo}..{hi}"))
            )?;
        }
        write!(
            f,
            "{} watchdog avg interval: {} ms",
            self.label,
            opt(self.watchdog_interval_ms)
        )
    }
}

/// Comparison lines for an EDF and an RM report.
pub fn compare(edf: &LogReport, rm: &LogReport) -> Vec<String> {
    let mut lines = Vec::new();

    match (edf.mean_response_ms(), rm.mean_response_ms()) {
        (Some(e), Some(r)) if e < r => lines.push(format!(
            "EDF shows better average response time ({e:.2} ms) vs RM ({r:.2} ms)."
        )),
        (Some(e), Some(r)) => lines.push(format!(
            "RM shows better average response time ({r:.2} ms) vs EDF ({e:.2} ms)."
        )),
        _ => lines.push("Unable to compare mean response times (missing data).".to_string()),
    }

    match (edf.mean_miss_ratio(), rm.mean_miss_ratio()) {
        (Some(e), Some(r)) if e < r => lines.push(format!(
            "EDF is more deadline-tolerant (miss ratio {e:.3} vs {r:.3})."
        )),
        (Some(e), Some(r)) => lines.push(format!(
            "RM is more deadline-tolerant (miss ratio {r:.3} vs {e:.3})."
        )),
        _ => lines.push("Unable to compare miss ratios (missing data).".to_string()),
    }

    lines
}

// ── Tests ─────────────────────────────────────────────────────────────────────
