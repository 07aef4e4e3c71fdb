/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured scheduling events and the sinks that record them.
//!
//! The engines report everything observable about a run through one
//! [`EventSink`]: releases, starts, completions and deadline misses.  There is
//! no other error channel; a deadline miss or a degraded lock acquisition is
//! visible only here (and in diagnostic `tracing` output).
//!
//! # Wire format
//! [`CsvSink`] writes one line per event:
//!
//! ```text
//! <timestamp_ms>,<KIND>,<job>,<detail>
//! 1210,MISS,Task2,1200
//! 1250,WDT_PET,WDT,
//! ```
//!
//! and [`Event::parse_csv`] reads the same lines back for offline analysis.

use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;

use thiserror::Error;
use tracing::{info, warn};

use crate::clock::Millis;

// ── EventKind ─────────────────────────────────────────────────────────────────

/// Kind of a logged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// EDF: the dispatcher marked a job ready.
    Release,
    /// An execution unit began an activation.
    Start,
    /// An execution unit finished an activation.
    Complete,
    /// EDF: a cycle ended after its absolute deadline.
    Miss,
    /// Watchdog heartbeat.
    WatchdogPet,
    /// Free-form supervisor notice.
    Info,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Release => "RELEASE",
            EventKind::Start => "START",
            EventKind::Complete => "COMPLETE",
            EventKind::Miss => "MISS",
            EventKind::WatchdogPet => "WDT_PET",
            EventKind::Info => "INFO",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = EventParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RELEASE" => Ok(EventKind::Release),
            "START" => Ok(EventKind::Start),
            "COMPLETE" => Ok(EventKind::Complete),
            "MISS" => Ok(EventKind::Miss),
            "WDT_PET" => Ok(EventKind::WatchdogPet),
            "INFO" => Ok(EventKind::Info),
            other => Err(EventParseError::UnknownKind(other.to_string())),
        }
    }
}

// ── Event ─────────────────────────────────────────────────────────────────────

/// One record of the event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub timestamp_ms: Millis,
    pub kind: EventKind,
    pub job: String,
    /// Optional detail, e.g. the absolute deadline for `START` / `MISS`.
    pub detail: Option<String>,
}

/// Why a log line could not be read back as an [`Event`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventParseError {
    #[error("expected at least 3 comma-separated fields, got {0}")]
    MissingFields(usize),

    #[error("invalid timestamp '{0}'")]
    BadTimestamp(String),

    #[error("unknown event kind '{0}'")]
    UnknownKind(String),
}

impl Event {
    pub fn new(timestamp_ms: Millis, kind: EventKind, job: impl Into<String>) -> Self {
        Self {
            timestamp_ms,
            kind,
            job: job.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }

    /// Detail parsed as a millisecond timestamp, if it is one.
    pub fn deadline(&self) -> Option<Millis> {
        self.detail.as_deref().and_then(|d| d.parse().ok())
    }

    /// Render as one CSV line (without the trailing newline).
    pub fn to_csv(&self) -> String {
        format!(
            "{},{},{},{}",
            self.timestamp_ms,
            self.kind,
            self.job,
            self.detail.as_deref().unwrap_or("")
        )
    }

    /// Parse one CSV line produced by [`Event::to_csv`].
    ///
    /// Surrounding whitespace is ignored, and so is a missing trailing detail
    /// field.  An empty detail parses as `None`.
    ///
    /// # Errors
    /// Returns an [`EventParseError`] describing the first malformed field.
    pub fn parse_csv(line: &str) -> Result<Self, EventParseError> {
        let fields: Vec<&str> = line.trim().splitn(4, ',').collect();
        if fields.len() < 3 {
            return Err(EventParseError::MissingFields(fields.len()));
        }

        let timestamp_ms = fields[0]
            .trim()
            .parse()
            .map_err(|_| EventParseError::BadTimestamp(fields[0].to_string()))?;
        let kind = fields[1].trim().parse()?;
        let detail = fields
            .get(3)
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(Self {
            timestamp_ms,
            kind,
            job: fields[2].trim().to_string(),
            detail,
        })
    }
}

// ── EventSink ─────────────────────────────────────────────────────────────────

/// Destination of the event log.
///
/// `emit` is called synchronously from the execution units, once per event.
/// Implementations must not block beyond their own I/O.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &Event);
}

/// Forwards every event into `tracing` at `INFO`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &Event) {
        info!(
            ts_ms  = event.timestamp_ms,
            kind   = %event.kind,
            job    = %event.job,
            detail = event.detail.as_deref().unwrap_or(""),
            "event"
        );
    }
}

/// Writes events as CSV lines to any writer (file, stdout, serial port...).
pub struct CsvSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl CsvSink {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Write an arbitrary line (e.g. a telemetry plot sample) into the same
    /// stream, serialised with the event records.
    pub fn write_line(&self, line: &str) {
        let mut w = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writeln!(w, "{line}").and_then(|_| w.flush()) {
            warn!("event log write failed: {e}");
        }
    }
}

impl EventSink for CsvSink {
    fn emit(&self, event: &Event) {
        self.write_line(&event.to_csv());
    }
}

/// Keeps every event in memory.  Used by tests and by callers that analyse a
/// run in-process.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far, in emission order.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Recorded events of one kind for one job.
    pub fn of(&self, kind: EventKind, job: &str) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.kind == kind && e.job == job)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}

/// Fans one event out to several sinks, in order.
#[derive(Default)]
pub struct Tee {
    sinks: Vec<std::sync::Arc<dyn EventSink>>,
}

impl Tee {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: std::sync::Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for Tee {
    fn emit(&self, event: &Event) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
