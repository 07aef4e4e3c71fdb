/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

use rts_core::config::WorkloadConfig;
use rts_core::engine::{Engine, Policy};
use rts_core::event::{CsvSink, EventSink, Tee, TracingSink};
use rts_core::glue::{spawn_plotter, spawn_watchdog, Supervisor};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Periodic EDF / Rate-Monotonic scheduling core.
///
/// Example:
///   rts-core --mode edf --config jobs.yaml --duration-ms 5000 --log edf.csv
#[derive(Debug, Parser)]
#[command(
    name = "rts-core",
    about = "Periodic EDF / RM scheduling core with shared-resource contention",
    long_about = None,
)]
struct Cli {
    /// Scheduling policy: `edf` or `rm`.  Asked on stdin when omitted.
    #[arg(short = 'm', long = "mode")]
    mode: Option<Policy>,

    /// Path to the YAML workload configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Supervisor horizon in milliseconds; 0 runs until Ctrl-C.
    #[arg(short = 't', long = "duration-ms", default_value_t = 20_000)]
    duration_ms: u64,

    /// CSV event log path (stdout when omitted).
    #[arg(short = 'l', long = "log")]
    log: Option<PathBuf>,

    /// Watchdog heartbeat period in milliseconds; 0 disables it.
    #[arg(short = 'w', long = "watchdog-ms", default_value_t = 500)]
    watchdog_ms: u64,

    /// Telemetry plot sampling period in milliseconds; 0 disables it.
    #[arg(short = 'p', long = "plot-ms", default_value_t = 0)]
    plot_ms: u64,

    /// Also forward every event to the diagnostic log.
    #[arg(short = 'e', long = "echo", default_value_t = false)]
    echo: bool,
}

// ── Setup helpers ─────────────────────────────────────────────────────────────

/// Interactive fallback when `--mode` is absent.
async fn prompt_policy() -> Result<Policy> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(b"Select scheduling mode:\n  1) EDF\n  2) RM\n> ")
        .await?;
    stdout.flush().await?;

    let mut line = String::new();
    let n = BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Cannot read scheduling mode from stdin")?;
    if n == 0 {
        bail!("No scheduling mode given (stdin closed)");
    }
    Ok(line.trim().parse::<Policy>()?)
}

fn open_log(path: Option<&PathBuf>) -> Result<CsvSink> {
    match path {
        Some(p) => {
            let file = File::create(p)
                .with_context(|| format!("Cannot create event log: {}", p.display()))?;
            Ok(CsvSink::new(BufWriter::new(file)))
        }
        None => Ok(CsvSink::new(std::io::stdout())),
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Initialise structured logging.
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    // Diagnostics go to stderr so the CSV event log can own stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("rts-core starting up...");

    // ── Parse CLI arguments ───────────────────────────────────────────────────
    let cli = Cli::parse();

    info!(
        mode        = ?cli.mode,
        config      = ?cli.config,
        duration_ms = cli.duration_ms,
        log         = ?cli.log,
        watchdog_ms = cli.watchdog_ms,
        plot_ms     = cli.plot_ms,
        "Configuration"
    );

    // ── Load workload configuration ───────────────────────────────────────────
    let workload = match &cli.config {
        Some(path) => match WorkloadConfig::load_from_file(path) {
            Ok(w) => w,
            Err(e) => {
                error!("Failed to load workload configuration: {:#}", e);
                process::exit(1);
            }
        },
        None => {
            warn!("No workload configuration file provided, using the reference job set");
            WorkloadConfig::default()
        }
    };

    // ── Pick the policy ───────────────────────────────────────────────────────
    let policy = match cli.mode {
        Some(p) => p,
        None => match prompt_policy().await {
            Ok(p) => p,
            Err(e) => {
                error!("Invalid scheduling mode: {:#}", e);
                process::exit(1);
            }
        },
    };

    // ── Event log ─────────────────────────────────────────────────────────────
    let csv = match open_log(cli.log.as_ref()) {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    };
    let sink: Arc<dyn EventSink> = if cli.echo {
        Arc::new(Tee::new().with(csv.clone()).with(Arc::new(TracingSink)))
    } else {
        csv.clone()
    };

    // ── Build and start the engine ────────────────────────────────────────────
    let engine = match Engine::new(policy, workload.engine_config(policy), sink.clone()) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Cannot build {policy} engine: {e}");
            process::exit(1);
        }
    };
    let handle = engine.start();
    let clock = handle.clock();
    let telemetry = handle.telemetry();
    let resource = handle.resource();

    let mut supervisor = Supervisor::new(handle, sink.clone());
    if cli.watchdog_ms > 0 {
        supervisor.attach(spawn_watchdog(
            clock,
            sink.clone(),
            Duration::from_millis(cli.watchdog_ms),
        ));
    }
    if cli.plot_ms > 0 {
        supervisor.attach(spawn_plotter(
            telemetry,
            csv.clone(),
            Duration::from_millis(cli.plot_ms),
        ));
    }

    let horizon = (cli.duration_ms > 0).then(|| Duration::from_millis(cli.duration_ms));
    supervisor.run(horizon).await;

    info!(
        acquired  = resource.stats().acquired(),
        timed_out = resource.stats().timed_out(),
        "Resource contention summary"
    );
}
