//! Error types emitted by the probemon CLI.
//!
//! Storage and runtime errors are boxed so `Result<_, CliError>` stays small
//! under `clippy::result_large_err`.

use std::{io, sync::Arc};

use camino::Utf8PathBuf;
use probemon_core::IgnoreListError;
use probemon_data::{StoreError, VendorTableError};
use probemon_monitor::{CaptureError, MonitorError};
use thiserror::Error;

/// Errors emitted by the probemon CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// The requested operation requires a missing compile-time feature.
    #[error("{action} requires the `{feature}` feature to be enabled")]
    MissingFeature {
        /// Cargo feature name.
        feature: &'static str,
        /// What the user asked for.
        action: &'static str,
    },
    /// A referenced input path does not exist on disk or is not a file.
    #[error("{field} path {path:?} does not exist or is not a file")]
    MissingSourceFile {
        /// Flag name.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A time bound could not be parsed.
    #[error("invalid --{field} value {value:?}: expected RFC 3339 or YYYY-MM-DD[ HH:MM:SS]")]
    InvalidTimestamp {
        /// Flag name.
        field: &'static str,
        /// Raw value.
        value: String,
    },
    /// The manufacturer table could not be loaded.
    #[error(transparent)]
    VendorTable(#[from] VendorTableError),
    /// An ignore-list entry is not a MAC address.
    #[error(transparent)]
    IgnoreList(#[from] IgnoreListError),
    /// Opening or querying the capture database failed.
    #[error("probe database error: {0}")]
    Store(#[source] Box<StoreError>),
    /// The capture interface could not be opened.
    #[error("failed to open capture source: {0}")]
    OpenCapture(#[source] Box<CaptureError>),
    /// The monitoring run ended with an error.
    #[error("monitor stopped: {0}")]
    Monitor(#[source] Box<MonitorError>),
    /// The shutdown signal handler could not be installed.
    #[error("failed to install shutdown handler: {0}")]
    SignalHandler(#[from] ctrlc::Error),
    /// A sighting could not be encoded as JSON.
    #[error("failed to serialise sighting: {0}")]
    SerialiseSighting(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] io::Error),
}

impl From<StoreError> for CliError {
    fn from(source: StoreError) -> Self {
        Self::Store(Box::new(source))
    }
}

impl From<MonitorError> for CliError {
    fn from(source: MonitorError) -> Self {
        Self::Monitor(Box::new(source))
    }
}
