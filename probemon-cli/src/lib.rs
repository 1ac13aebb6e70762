//! Command-line interface for the probemon probe-request monitor.
//!
//! `probemon capture` records probe requests from a monitor-mode interface
//! into SQLite; `probemon log` reads them back. Settings layer CLI flags over
//! `PROBEMON_*` environment variables over a configuration file.
#![forbid(unsafe_code)]

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use clap::{Parser, Subcommand};
use log::info;

mod capture;
mod error;
mod history;

pub use error::CliError;

use capture::{CaptureArgs, run_capture};
use history::{LogArgs, run_log};

const ARG_INTERFACE: &str = "interface";
const ARG_DB: &str = "db";
const ARG_MANUF: &str = "manuf";
const ARG_IGNORE: &str = "ignore";
const ARG_STDOUT: &str = "stdout";
const ARG_COMMIT_INTERVAL: &str = "commit-interval";
const ARG_QUEUE_CAPACITY: &str = "queue-capacity";
const ARG_CACHE_CAPACITY: &str = "cache-capacity";
const ARG_MAC: &str = "mac";
const ARG_RSSI: &str = "rssi";
const ARG_AFTER: &str = "after";
const ARG_BEFORE: &str = "before";
const ARG_SKIP_ZERO: &str = "skip-zero";
const ARG_JSON: &str = "json";
const ARG_SSID: &str = "ssid";
const ARG_PRIVACY: &str = "privacy";
const ENV_INTERFACE: &str = "PROBEMON_CMDS_CAPTURE_INTERFACE";

const DEFAULT_DB: &str = "probemon.db";
const DEFAULT_MANUF: &str = "manuf";

/// Run the probemon CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when arguments, configuration, inputs or the
/// monitoring run fail.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Capture(args) => {
            let shutdown = install_shutdown_handler()?;
            run_capture(args, &shutdown)
        }
        Command::Log(args) => {
            let mut stdout = std::io::stdout().lock();
            run_log(args, &mut stdout)
        }
    }
}

/// Raise a shared flag on SIGINT or SIGTERM.
fn install_shutdown_handler() -> Result<Arc<AtomicBool>, CliError> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("shutdown requested; draining pending probes");
        flag.store(true, Ordering::SeqCst);
    })?;
    Ok(shutdown)
}

#[derive(Debug, Parser)]
#[command(
    name = "probemon",
    about = "Passive Wi-Fi probe-request monitor with SQLite persistence",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Record probe requests from a monitor-mode interface.
    Capture(CaptureArgs),
    /// Print sightings stored by earlier captures.
    Log(LogArgs),
}

#[cfg(test)]
mod tests;
