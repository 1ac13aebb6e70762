//! Test helpers for building capture inputs and layered overrides.

use std::{fs, sync::atomic::AtomicBool};

use camino::{Utf8Path, Utf8PathBuf};
use probemon_core::test_support::{DEFAULT_CAPTURED_AT_SECS, ProbeFrameBuilder};
use probemon_monitor::ReplaySource;
use tempfile::TempDir;

use super::*;
use crate::capture::{CaptureArgs, CaptureConfig, execute_capture};

pub(super) const PHONE: [u8; 6] = [0x00, 0x1b, 0xc5, 0x12, 0x34, 0x56];
pub(super) const RANDOMISED: [u8; 6] = [0xda, 0xa1, 0x19, 0x00, 0x00, 0x01];

const VENDOR_TABLE: &str = "\
# OUI table used by the CLI tests
00:1B:C5\tIeee8021\tIEEE Registration Authority
DA:A1:19\tGoogle
";

/// Scratch directory holding a manufacturer table and a database path.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        write_utf8(&root.join("manuf"), VENDOR_TABLE.as_bytes());
        Self { _dir: dir, root }
    }

    pub(super) fn manuf(&self) -> Utf8PathBuf {
        self.root.join("manuf")
    }

    pub(super) fn db(&self) -> Utf8PathBuf {
        self.root.join("probemon.db")
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    pub(super) fn capture_config(&self) -> CaptureConfig {
        CaptureConfig::try_from(CaptureArgs {
            interface: Some("mon0".to_owned()),
            db: Some(self.db()),
            manuf: Some(self.manuf()),
            ..CaptureArgs::default()
        })
        .expect("complete capture arguments")
    }

    /// Store one "home" probe from each device, then one "office" probe from
    /// the phone, one second apart.
    pub(super) fn record_sightings(&self) {
        let frames: Vec<_> = [
            (PHONE, b"home".as_slice(), -47),
            (RANDOMISED, b"home", -80),
            (PHONE, b"office", -52),
        ]
        .into_iter()
        .zip(0..)
        .map(|((mac, ssid, rssi), offset)| {
            ProbeFrameBuilder::new(mac)
                .ssid(ssid)
                .rssi(rssi)
                .captured_at_secs(DEFAULT_CAPTURED_AT_SECS + offset)
                .build()
        })
        .collect();
        let report = execute_capture(
            &self.capture_config(),
            &mut ReplaySource::new(frames),
            &AtomicBool::new(false),
        )
        .expect("capture replayed frames");
        assert_eq!(report.pipeline.persisted, 3);
    }
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    fs::write(path.as_std_path(), contents).expect("write fixture file");
}

/// Values a configuration file or the environment would supply.
#[derive(Debug, Clone, Default)]
pub(super) struct LayerOverrides {
    pub(super) interface: Option<String>,
    pub(super) db: Option<Utf8PathBuf>,
    pub(super) commit_interval: Option<u64>,
}

/// Apply CLI > environment > file precedence without touching the process
/// environment.
pub(super) fn merge_layers(
    mut cli_args: CaptureArgs,
    file_layer: Option<LayerOverrides>,
    env_layer: Option<LayerOverrides>,
) -> Result<CaptureConfig, CliError> {
    merge_field(
        &mut cli_args.interface,
        extract_field(env_layer.as_ref(), |layer| &layer.interface),
        extract_field(file_layer.as_ref(), |layer| &layer.interface),
    );
    merge_field(
        &mut cli_args.db,
        extract_field(env_layer.as_ref(), |layer| &layer.db),
        extract_field(file_layer.as_ref(), |layer| &layer.db),
    );
    merge_field(
        &mut cli_args.commit_interval,
        extract_field(env_layer.as_ref(), |layer| &layer.commit_interval),
        extract_field(file_layer.as_ref(), |layer| &layer.commit_interval),
    );
    CaptureConfig::try_from(cli_args)
}

fn merge_field<T>(target: &mut Option<T>, env_value: Option<T>, file_value: Option<T>) {
    if target.is_none() {
        *target = env_value.or(file_value);
    }
}

fn extract_field<T: Clone>(
    layer: Option<&LayerOverrides>,
    accessor: fn(&LayerOverrides) -> &Option<T>,
) -> Option<T> {
    layer.and_then(|entry| accessor(entry).clone())
}
