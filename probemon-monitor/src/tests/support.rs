//! Shared fixtures: a small vendor table, on-disk databases and an echo
//! recorder.

use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use probemon_core::ProbeEvent;
use probemon_data::VendorResolver;
use rusqlite::Connection;
use tempfile::TempDir;

use crate::echo::{EchoSink, format_event};

pub(super) const VENDOR_TABLE: &str = "\
00:1B:C5\tIeee8021\tIEEE Registration Authority
DA:A1:19\tGoogle
";

pub(super) fn vendors() -> VendorResolver {
    VendorResolver::from_table_text(VENDOR_TABLE, "fixture".into()).expect("vendor table")
}

pub(super) fn db_path(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().join("probemon.db")).expect("UTF-8 temp path")
}

pub(super) fn count_rows(path: &Utf8Path, table: &str) -> i64 {
    let reader = Connection::open(path).expect("open reader connection");
    reader
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .expect("count rows")
}

/// Echo sink keeping every rendered line.
#[derive(Debug, Clone, Default)]
pub(super) struct RecordingSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub(super) fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("echo lock").clone()
    }
}

impl EchoSink for RecordingSink {
    fn echo(&mut self, event: &ProbeEvent) -> std::io::Result<()> {
        self.lines
            .lock()
            .expect("echo lock")
            .push(format_event(event, &Utc));
        Ok(())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
