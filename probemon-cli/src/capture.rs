//! `capture` command: record probe requests into SQLite.

use std::{sync::atomic::AtomicBool, time::Duration};

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use probemon_core::{IgnoreFilter, QueueConfig};
use probemon_data::{
    BatcherConfig, PersistenceBatcher, SystemClock, VendorResolver, fs::is_file,
    store::{DEFAULT_CACHE_CAPACITY, DEFAULT_COMMIT_INTERVAL},
};
use probemon_monitor::{EchoWriter, EventPipeline, FrameSource, MonitorReport, run_monitor};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_CACHE_CAPACITY, ARG_COMMIT_INTERVAL, ARG_DB, ARG_IGNORE, ARG_INTERFACE, ARG_MANUF,
    ARG_QUEUE_CAPACITY, ARG_STDOUT, CliError, DEFAULT_DB, DEFAULT_MANUF, ENV_INTERFACE,
};

/// CLI arguments for the `capture` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Record probe requests seen on a monitor-mode interface. The \
                 radio must already be in monitor mode on the wanted channel. \
                 Sightings are committed to SQLite at a fixed interval and on \
                 shutdown (SIGINT or SIGTERM).",
    about = "Record probe requests into a SQLite database"
)]
#[ortho_config(prefix = "PROBEMON")]
pub(crate) struct CaptureArgs {
    /// Monitor-mode interface to capture on.
    #[arg(short = 'i', long = ARG_INTERFACE, value_name = "name")]
    #[serde(default)]
    pub(crate) interface: Option<String>,
    /// SQLite database to append to (default `probemon.db`).
    #[arg(long = ARG_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) db: Option<Utf8PathBuf>,
    /// Tab-separated manufacturer table (default `manuf`).
    #[arg(long = ARG_MANUF, value_name = "path")]
    #[serde(default)]
    pub(crate) manuf: Option<Utf8PathBuf>,
    /// MAC address to drop before storage; may be repeated.
    #[arg(long = ARG_IGNORE, value_name = "mac")]
    #[serde(default)]
    pub(crate) ignored: Option<Vec<String>>,
    /// Echo every stored probe request to standard output.
    #[arg(long = ARG_STDOUT)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) stdout: bool,
    /// Seconds between commits (default 60).
    #[arg(long = ARG_COMMIT_INTERVAL, value_name = "secs")]
    #[serde(default)]
    pub(crate) commit_interval: Option<u64>,
    /// Probe requests buffered between capture and storage (default 128).
    #[arg(long = ARG_QUEUE_CAPACITY, value_name = "count")]
    #[serde(default)]
    pub(crate) queue_capacity: Option<usize>,
    /// MAC and SSID row ids kept in memory (default 128 each).
    #[arg(long = ARG_CACHE_CAPACITY, value_name = "count")]
    #[serde(default)]
    pub(crate) cache_capacity: Option<usize>,
}

impl CaptureArgs {
    pub(crate) fn into_config(self) -> Result<CaptureConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        CaptureConfig::try_from(merged)
    }
}

/// Resolved `capture` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CaptureConfig {
    pub(crate) interface: String,
    pub(crate) db: Utf8PathBuf,
    pub(crate) manuf: Utf8PathBuf,
    pub(crate) ignored: Vec<String>,
    pub(crate) stdout: bool,
    pub(crate) batcher: BatcherConfig,
    pub(crate) queue: QueueConfig,
}

impl CaptureConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.manuf, ARG_MANUF)
    }
}

impl TryFrom<CaptureArgs> for CaptureConfig {
    type Error = CliError;

    fn try_from(args: CaptureArgs) -> Result<Self, Self::Error> {
        let interface = args.interface.ok_or(CliError::MissingArgument {
            field: ARG_INTERFACE,
            env: ENV_INTERFACE,
        })?;
        let cache_capacity = args.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY);
        let batcher = BatcherConfig {
            commit_interval: args
                .commit_interval
                .map_or(DEFAULT_COMMIT_INTERVAL, Duration::from_secs),
            mac_cache_capacity: cache_capacity,
            ssid_cache_capacity: cache_capacity,
        };
        let queue_defaults = QueueConfig::default();
        let queue = QueueConfig {
            capacity: args.queue_capacity.unwrap_or(queue_defaults.capacity),
            ..queue_defaults
        };
        Ok(Self {
            interface,
            db: args.db.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DB)),
            manuf: args.manuf.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_MANUF)),
            ignored: args.ignored.unwrap_or_default(),
            stdout: args.stdout,
            batcher,
            queue,
        })
    }
}

pub(crate) fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    if is_file(path) {
        Ok(())
    } else {
        Err(CliError::MissingSourceFile {
            field,
            path: path.to_path_buf(),
        })
    }
}

pub(crate) fn resolve_capture_config(args: CaptureArgs) -> Result<CaptureConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    Ok(config)
}

pub(crate) fn run_capture(args: CaptureArgs, shutdown: &AtomicBool) -> Result<(), CliError> {
    let config = resolve_capture_config(args)?;
    let mut source = open_source(&config.interface)?;
    execute_capture(&config, source.as_mut(), shutdown).map(|_| ())
}

/// Load the vendor table and ignore list, open the database and run until
/// `source` closes or `shutdown` is raised.
pub(crate) fn execute_capture(
    config: &CaptureConfig,
    source: &mut dyn FrameSource,
    shutdown: &AtomicBool,
) -> Result<MonitorReport, CliError> {
    let pipeline = build_pipeline(config)?;
    let report = run_monitor(source, pipeline, config.queue, shutdown)?;
    info!(
        "captured {} frames ({} dropped); stored {} probes, ignored {}, {} commits; queue peaked at {}",
        report.capture.frames,
        report.capture.dropped,
        report.pipeline.persisted,
        report.pipeline.ignored,
        report.pipeline.commits,
        report.queue_high_water,
    );
    Ok(report)
}

fn build_pipeline(config: &CaptureConfig) -> Result<EventPipeline, CliError> {
    let vendors = VendorResolver::load(&config.manuf)?;
    let ignored = IgnoreFilter::from_entries(&config.ignored)?;
    let batcher = PersistenceBatcher::open(&config.db, config.batcher, SystemClock)?;
    let pipeline = EventPipeline::new(vendors, ignored, batcher);
    Ok(if config.stdout {
        pipeline.with_echo(EchoWriter::stdout())
    } else {
        pipeline
    })
}

#[cfg(feature = "live-capture")]
pub(crate) fn open_source(interface: &str) -> Result<Box<dyn FrameSource>, CliError> {
    let source = probemon_monitor::PcapSource::open(interface)
        .map_err(|err| CliError::OpenCapture(Box::new(err)))?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "live-capture"))]
pub(crate) fn open_source(_interface: &str) -> Result<Box<dyn FrameSource>, CliError> {
    Err(CliError::MissingFeature {
        feature: "live-capture",
        action: "capture",
    })
}
