//! SQLite persistence for probe sightings.
//!
//! - [`schema`] creates the normalised tables and checks their version.
//! - [`batcher`] writes events inside long-lived transactions.
//! - [`query`] reads sightings back for reporting.
#![forbid(unsafe_code)]

mod batcher;
mod clock;
mod query;
mod schema;

use std::io;

use camino::Utf8PathBuf;
use rusqlite::Error as SqliteError;
use thiserror::Error;

pub use batcher::{
    BatcherConfig, DEFAULT_CACHE_CAPACITY, DEFAULT_COMMIT_INTERVAL, PersistenceBatcher,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use query::{LogFilter, ProbeLog, Sighting};
pub use schema::{SCHEMA_VERSION, SchemaError, apply_pragmas, initialise_schema, verify_schema};

/// Errors raised while reading or writing the probe database.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database directory could not be created.
    #[error("failed to prepare directory for {path}")]
    Io {
        /// Database location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The database file could not be opened.
    #[error("failed to open SQLite database at {path}")]
    Open {
        /// Database location.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Schema creation or validation failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// A statement failed.
    #[error("SQLite operation '{operation}' failed")]
    Sqlite {
        /// Label of the failing operation.
        operation: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// The requested SSID has never been recorded.
    #[error("SSID {ssid:?} not found in database")]
    UnknownSsid {
        /// Stored SSID name that was requested.
        ssid: String,
    },
    /// A stored row could not be interpreted.
    #[error("corrupt probe row: {detail}")]
    CorruptRow {
        /// What was wrong with the row.
        detail: String,
    },
}

#[cfg(test)]
mod tests;
