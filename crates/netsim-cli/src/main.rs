//! NetSim command-line front end.
//!
//! Reads `factory_structure.txt` from the working directory, prints the
//! structural report, saves the parsed topology back to
//! `factory_structure_saved.txt`, then runs a bounded simulation with
//! per-turn reports. Exits 0 on success, 1 on any load, consistency or
//! simulation failure.

use anyhow::{Context, Result};
use netsim_core::notifier::ReportNotifier;
use netsim_core::report::{write_structure_report, write_turn_report};
use netsim_core::simulation::simulate;
use netsim_core::topology::{load_factory_structure, save_factory_structure};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

const INPUT_FILE: &str = "factory_structure.txt";
const SAVED_FILE: &str = "factory_structure_saved.txt";
const HORIZON: u64 = 5;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let input = File::open(INPUT_FILE)
        .with_context(|| format!("could not open {INPUT_FILE}"))?;
    let mut factory = load_factory_structure(BufReader::new(input))
        .with_context(|| format!("could not load {INPUT_FILE}"))?;
    info!("factory structure loaded");

    let mut out = io::stdout();

    writeln!(out, "--- Initial Factory Structure ---\n")?;
    write_structure_report(&factory, &mut out)?;

    let mut saved = File::create(SAVED_FILE)
        .with_context(|| format!("could not create {SAVED_FILE}"))?;
    save_factory_structure(&factory, &mut saved)?;
    info!("structure saved to {SAVED_FILE}");

    let notifier = ReportNotifier::Interval(1);
    writeln!(out, "--- Running Simulation ---\n")?;
    // The observer has no error channel; park the first write failure
    // and surface it after the run like every other I/O error here.
    let mut report_error: Option<io::Error> = None;
    simulate(&mut factory, HORIZON, |f, t| {
        if notifier.should_report(t) && report_error.is_none() {
            if let Err(err) = write_turn_report(f, &mut io::stdout(), t) {
                report_error = Some(err);
            }
        }
    })?;
    if let Some(err) = report_error {
        return Err(err).context("could not write turn report");
    }

    Ok(())
}
