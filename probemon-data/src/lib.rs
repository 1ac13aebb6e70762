//! Storage and reference data for the probemon probe-request monitor.
//!
//! Responsibilities:
//! - Load the manufacturer table and resolve MAC addresses to vendors.
//! - Persist probe events into a normalised SQLite database in long-lived
//!   transactions, and read them back for reporting.
//!
//! Boundaries:
//! - No frame decoding (lives in `probemon-core`).
//! - No threads; callers own the worker that drives the batcher.
//!
//! Invariants:
//! - The vendor table is immutable once loaded.
//! - Every SQLite value is bound as a statement parameter.
#![forbid(unsafe_code)]

pub mod fs;
pub mod store;
pub mod vendor;

pub use store::{
    BatcherConfig, LogFilter, PersistenceBatcher, ProbeLog, Sighting, StoreError, SystemClock,
};
pub use vendor::{VendorRecord, VendorResolver, VendorTableError};
