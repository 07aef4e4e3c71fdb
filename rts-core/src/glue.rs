/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Collaborators that run beside an engine but never touch its registry or
//! its resource: the watchdog heartbeat, the telemetry plot sampler and the
//! supervisor that halts everything after a fixed horizon.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::engine::EngineHandle;
use crate::event::{CsvSink, Event, EventKind, EventSink};
use crate::telemetry::Telemetry;

/// Job name used for watchdog heartbeats.
pub const WATCHDOG_NAME: &str = "WDT";
/// Job name used for supervisor notices.
pub const SUPERVISOR_NAME: &str = "Supervisor";

/// Emit a `WDT_PET` event every `period`, first one after one full period.
pub fn spawn_watchdog(
    clock: Clock,
    sink: Arc<dyn EventSink>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sink.emit(&Event::new(clock.now_ms(), EventKind::WatchdogPet, WATCHDOG_NAME));
        }
    })
}

/// Write one telemetry plot line (`"1 0 0"`) into `out` every `period`.
pub fn spawn_plotter(
    telemetry: Arc<Telemetry>,
    out: Arc<CsvSink>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            out.write_line(&telemetry.plot_line());
        }
    })
}

/// Owns a running engine and its glue tasks until the halt condition.
pub struct Supervisor {
    engine: EngineHandle,
    glue: Vec<JoinHandle<()>>,
    sink: Arc<dyn EventSink>,
}

impl Supervisor {
    pub fn new(engine: EngineHandle, sink: Arc<dyn EventSink>) -> Self {
        Self {
            engine,
            glue: Vec::new(),
            sink,
        }
    }

    /// Register a glue task to be stopped together with the engine.
    pub fn attach(&mut self, task: JoinHandle<()>) {
        self.glue.push(task);
    }

    /// Wait `horizon` (or Ctrl-C when `None`), then halt everything at once.
    pub async fn run(self, horizon: Option<Duration>) {
        match horizon {
            Some(h) => {
                info!(horizon_ms = h.as_millis() as u64, "supervisor armed");
                tokio::time::sleep(h).await;
            }
            None => {
                info!("supervisor waiting for Ctrl-C");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("cannot listen for Ctrl-C: {e}");
                }
            }
        }
        self.halt();
    }

    /// Immediate, total halt.
    pub fn halt(self) {
        let now = self.engine.clock().now_ms();
        self.sink.emit(
            &Event::new(now, EventKind::Info, SUPERVISOR_NAME).with_detail("HALT"),
        );
        info!(policy = %self.engine.policy(), at_ms = now, "halting");

        for task in &self.glue {
            task.abort();
        }
        self.engine.halt();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{start_edf, EngineConfig, Policy};
    use crate::event::MemorySink;

    #[tokio::test(start_paused = true)]
    async fn watchdog_pets_at_its_period() {
        let sink = Arc::new(MemorySink::new());
        let task = spawn_watchdog(Clock::start(), sink.clone(), Duration::from_millis(500));

        tokio::time::sleep(Duration::from_millis(2_100)).await;
        task.abort();

        let pets: Vec<u64> = sink
            .of(EventKind::WatchdogPet, WATCHDOG_NAME)
            .iter()
            .map(|e| e.timestamp_ms)
            .collect();
        assert_eq!(pets, vec![500, 1_000, 1_500, 2_000]);
    }

    #[derive(Clone, Default)]
    struct Lines(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Lines {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn plotter_samples_telemetry_at_its_period() {
        let telemetry = Arc::new(Telemetry::new(3));
        telemetry.set_running(1, true);
        let buf = Lines::default();
        let out = Arc::new(CsvSink::new(buf.clone()));

        let task = spawn_plotter(telemetry, out, Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(250)).await;
        task.abort();

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(text, "0 1 0\n0 1 0\n0 1 0\n");
    }

    #[tokio::test(start_paused = true)]
    async fn supervisor_halts_engine_and_glue_after_horizon() {
        let sink = Arc::new(MemorySink::new());
        let engine = start_edf(EngineConfig::reference(Policy::Edf), sink.clone()).unwrap();
        let clock = engine.clock();

        let mut supervisor = Supervisor::new(engine, sink.clone());
        supervisor.attach(spawn_watchdog(clock, sink.clone(), Duration::from_millis(500)));
        supervisor.run(Some(Duration::from_millis(1_000))).await;

        let halt = sink.of(EventKind::Info, SUPERVISOR_NAME);
        assert_eq!(halt.len(), 1);
        assert_eq!(halt[0].timestamp_ms, 1_000);

        let count = sink.events().len();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(sink.events().len(), count, "nothing runs after the halt");
    }
}
