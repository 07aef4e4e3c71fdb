/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

mod metrics;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{error, info, warn};

use metrics::{compare, load_log, LogReport};

/// Offline analyzer for rts-core CSV event logs.
///
/// Example:
///   rts-analyze --edf edf_log.csv --rm rm_log.csv
#[derive(Debug, Parser)]
#[command(
    name = "rts-analyze",
    about = "Per-job metrics and EDF/RM comparison from rts-core event logs",
    long_about = None,
)]
struct Cli {
    /// Event log recorded in EDF mode.
    #[arg(short = 'e', long = "edf")]
    edf: Option<PathBuf>,

    /// Event log recorded in RM mode.
    #[arg(short = 'r', long = "rm")]
    rm: Option<PathBuf>,
}

fn report(label: &str, path: &Path) -> Result<LogReport> {
    let log = load_log(path)?;
    if log.skipped > 0 {
        warn!(
            "{}: skipped {} line(s) that are not event records",
            path.display(),
            log.skipped
        );
    }
    info!("{}: {} event(s)", path.display(), log.events.len());
    Ok(LogReport::from_events(label, &log.events))
}

fn run(cli: &Cli) -> Result<()> {
    if cli.edf.is_none() && cli.rm.is_none() {
        bail!("Nothing to analyze: pass --edf and/or --rm");
    }

    let edf = cli.edf.as_ref().map(|p| report("EDF", p)).transpose()?;
    let rm = cli.rm.as_ref().map(|p| report("RM", p)).transpose()?;

    for r in edf.iter().chain(rm.iter()) {
        println!("\n{r}");
    }

    if let (Some(edf), Some(rm)) = (&edf, &rm) {
        println!("\n===== COMPARISON SUMMARY =====");
        for line in compare(edf, rm) {
            println!("{line}");
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        process::exit(1);
    }
}
