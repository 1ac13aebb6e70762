//! Unit tests for the probe store.


use std::{sync::Arc, time::Duration};

use camino::{Utf8Path, Utf8PathBuf};
use probemon_core::{IgnoreFilter, MacAddress, ProbeEvent, SsidName, test_support::at_secs};
use rstest::{fixture, rstest};
use rusqlite::Connection;
use tempfile::TempDir;

use super::{
    BatcherConfig, LogFilter, ManualClock, PersistenceBatcher, ProbeLog, SchemaError, StoreError,
    SystemClock,
};

const PHONE: &str = "00:1b:c5:12:34:56";
const RANDOMISED: &str = "da:a1:19:00:00:01";
const LAPTOP: &str = "00:1b:c5:ff:00:01";

pub(super) fn mac(text: &str) -> MacAddress {
    text.parse().expect("valid MAC address")
}

pub(super) fn probe(address: &str, ssid: &[u8], rssi: i8, secs: i64) -> ProbeEvent {
    ProbeEvent {
        captured_at: at_secs(secs),
        mac: mac(address),
        ssid: ssid.to_vec(),
        rssi,
        frequency: 2412,
        vendor: None,
    }
}

pub(super) fn utf8_path(dir: &TempDir, name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("UTF-8 temp path")
}

pub(super) fn count(path: &Utf8Path, sql: &str) -> i64 {
    let reader = Connection::open(path).expect("open reader connection");
    reader.query_row(sql, [], |row| row.get(0)).expect("count rows")
}

#[fixture]
fn batcher() -> PersistenceBatcher<Arc<ManualClock>> {
    let conn = Connection::open_in_memory().expect("in-memory database");
    PersistenceBatcher::new(conn, BatcherConfig::default(), Arc::new(ManualClock::new()))
        .expect("prepare database")
}

#[rstest]
fn vendor_get_or_create_is_idempotent(batcher: PersistenceBatcher<Arc<ManualClock>>) {
    let first = batcher.get_or_create_vendor("Acme").expect("insert vendor");
    let second = batcher.get_or_create_vendor("Acme").expect("find vendor");
    let other = batcher.get_or_create_vendor("Other").expect("insert vendor");
    assert_eq!(first, second);
    assert_ne!(first, other);
    let rows: i64 = batcher
        .connection()
        .query_row("SELECT COUNT(*) FROM vendor", [], |row| row.get(0))
        .expect("count vendors");
    assert_eq!(rows, 2);
}

#[rstest]
fn names_with_quotes_are_bound_verbatim(mut batcher: PersistenceBatcher<Arc<ManualClock>>) {
    let ssid = SsidName::from_bytes(b"Bob's \"cafe\"");
    let id = batcher.get_or_create_ssid(&ssid).expect("insert ssid");
    let stored: String = batcher
        .connection()
        .query_row("SELECT name FROM ssid WHERE id = ?1", [id], |row| row.get(0))
        .expect("read ssid");
    assert_eq!(stored, "Bob's \"cafe\"");
}

#[rstest]
fn existing_mac_keeps_its_vendor(mut batcher: PersistenceBatcher<Arc<ManualClock>>) {
    let acme = batcher.get_or_create_vendor("Acme").expect("vendor");
    let other = batcher.get_or_create_vendor("Other").expect("vendor");
    let first = batcher.get_or_create_mac(mac(PHONE), acme).expect("insert mac");
    batcher.forget(mac(PHONE), &SsidName::from_bytes(b""));
    let again = batcher.get_or_create_mac(mac(PHONE), other).expect("find mac");
    assert_eq!(first, again);
    let vendor: i64 = batcher
        .connection()
        .query_row("SELECT vendor_id FROM mac WHERE id = ?1", [first], |row| row.get(0))
        .expect("read mac");
    assert_eq!(vendor, acme);
}

#[rstest]
fn unknown_vendor_id_is_rejected(mut batcher: PersistenceBatcher<Arc<ManualClock>>) {
    let err = batcher
        .get_or_create_mac(mac(PHONE), 9_999)
        .expect_err("foreign key violation");
    assert!(matches!(
        err,
        StoreError::Sqlite {
            operation: "insert mac",
            ..
        }
    ));
}

#[rstest]
fn binary_ssid_round_trips_through_b64(mut batcher: PersistenceBatcher<Arc<ManualClock>>) {
    let raw = [0xff, 0x00, b'x'];
    batcher
        .record(&probe(PHONE, &raw, -50, 10))
        .expect("record probe");
    let stored: String = batcher
        .connection()
        .query_row("SELECT name FROM ssid", [], |row| row.get(0))
        .expect("read ssid");
    assert_eq!(stored, "b64_/wB4");
    let decoded = SsidName::from_bytes(&raw).to_bytes().expect("b64 payload");
    assert_eq!(decoded, raw);
}

#[rstest]
fn unresolved_vendor_is_stored_as_unknown(mut batcher: PersistenceBatcher<Arc<ManualClock>>) {
    batcher
        .record(&probe(PHONE, b"home", -50, 10))
        .expect("record probe");
    let vendor: String = batcher
        .connection()
        .query_row(
            "SELECT vendor.name FROM mac JOIN vendor ON vendor.id = mac.vendor_id",
            [],
            |row| row.get(0),
        )
        .expect("read vendor");
    assert_eq!(vendor, "unknown");
}

#[rstest]
fn failing_event_is_rolled_back_alone(mut batcher: PersistenceBatcher<Arc<ManualClock>>) {
    batcher
        .connection()
        .execute_batch(
            "CREATE TEMP TRIGGER reject_silent BEFORE INSERT ON probe WHEN NEW.rssi = 0
             BEGIN SELECT RAISE(ABORT, 'rejected'); END",
        )
        .expect("install trigger");
    batcher
        .record(&probe(PHONE, b"home", -50, 10))
        .expect("first probe");

    let err = batcher
        .record(&probe(LAPTOP, b"lost", 0, 11))
        .expect_err("trigger rejects probe");
    assert!(matches!(
        err,
        StoreError::Sqlite {
            operation: "insert probe",
            ..
        }
    ));

    let conn = batcher.connection();
    let count = |sql: &str| -> i64 {
        conn.query_row(sql, [], |row| row.get(0))
            .expect("count rows")
    };
    assert_eq!(count("SELECT COUNT(*) FROM probe"), 1);
    assert_eq!(count("SELECT COUNT(*) FROM ssid WHERE name = 'lost'"), 0);
    assert_eq!(count("SELECT COUNT(*) FROM mac"), 1);

    // The rejected event's ids left the caches with the rollback, so the
    // laptop is inserted afresh while "home" still resolves from the cache.
    batcher
        .record(&probe(LAPTOP, b"home", -70, 12))
        .expect("later probe");
    assert_eq!(batcher.finish().expect("final commit"), 1);
}

#[rstest]
fn commits_once_the_interval_elapses() {
    let dir = TempDir::new().expect("temp dir");
    let path = utf8_path(&dir, "probes.db");
    let clock = Arc::new(ManualClock::new());
    let mut batcher = PersistenceBatcher::open(&path, BatcherConfig::default(), Arc::clone(&clock))
        .expect("open database");

    batcher.record(&probe(PHONE, b"home", -50, 0)).expect("t=0");
    assert!(!batcher.maybe_commit().expect("too early"));
    assert_eq!(count(&path, "SELECT COUNT(*) FROM probe"), 0);

    clock.advance(Duration::from_secs(61));
    batcher.record(&probe(PHONE, b"home", -51, 61)).expect("t=61");
    assert_eq!(batcher.commits(), 1);
    assert_eq!(count(&path, "SELECT COUNT(*) FROM probe"), 1);

    assert_eq!(batcher.finish().expect("final commit"), 2);
    assert_eq!(count(&path, "SELECT COUNT(*) FROM probe"), 2);
}

#[rstest]
fn open_creates_missing_directories() {
    let dir = TempDir::new().expect("temp dir");
    let path = utf8_path(&dir, "nested/deeper/probes.db");
    let batcher = PersistenceBatcher::open(&path, BatcherConfig::default(), SystemClock)
        .expect("open database");
    assert_eq!(batcher.finish().expect("final commit"), 1);
    assert!(path.is_file());
}

/// Database holding three sightings, closed and ready for reading.
struct PopulatedLog {
    _dir: TempDir,
    log: ProbeLog,
}

#[fixture]
fn populated() -> PopulatedLog {
    let dir = TempDir::new().expect("temp dir");
    let path = utf8_path(&dir, "probes.db");
    let mut batcher = PersistenceBatcher::open(&path, BatcherConfig::default(), SystemClock)
        .expect("open database");
    let mut phone = probe(PHONE, b"home", -47, 100);
    phone.vendor = Some("Acme".to_owned());
    for event in [
        phone,
        probe(RANDOMISED, b"home", -80, 200),
        probe(LAPTOP, b"office", 0, 300),
    ] {
        batcher.record(&event).expect("record probe");
    }
    batcher.finish().expect("final commit");
    let log = ProbeLog::open(&path).expect("open log");
    PopulatedLog { _dir: dir, log }
}

fn macs_of(log: &ProbeLog, filter: &LogFilter) -> Vec<String> {
    log.sightings(filter)
        .expect("query sightings")
        .into_iter()
        .map(|sighting| sighting.mac.to_string())
        .collect()
}

#[rstest]
fn sightings_join_names_in_time_order(populated: PopulatedLog) {
    let sightings = populated
        .log
        .sightings(&LogFilter::default())
        .expect("query sightings");
    let summary: Vec<_> = sightings
        .iter()
        .map(|s| (s.mac.to_string(), s.vendor.as_str(), s.ssid.as_str(), s.rssi))
        .collect();
    assert_eq!(
        summary,
        vec![
            (PHONE.to_owned(), "Acme", "home", -47),
            (RANDOMISED.to_owned(), "unknown", "home", -80),
            (LAPTOP.to_owned(), "unknown", "office", 0),
        ]
    );
    assert_eq!(sightings.first().map(|s| s.timestamp), Some(at_secs(100)));
}

#[rstest]
#[case::prefix(LogFilter { mac_prefixes: vec!["00:1B:C5".to_owned()], ..LogFilter::default() }, &[PHONE, LAPTOP])]
#[case::full_address(LogFilter { mac_prefixes: vec![PHONE.to_owned()], ..LogFilter::default() }, &[PHONE])]
#[case::underscore_is_literal(LogFilter { mac_prefixes: vec!["00_1b".to_owned()], ..LogFilter::default() }, &[])]
#[case::percent_is_literal(LogFilter { mac_prefixes: vec!["%".to_owned()], ..LogFilter::default() }, &[])]
#[case::any_prefix(LogFilter { mac_prefixes: vec![PHONE.to_owned(), "da:".to_owned()], ..LogFilter::default() }, &[PHONE, RANDOMISED])]
#[case::rssi_strictly_above(LogFilter { rssi_above: Some(-47), ..LogFilter::default() }, &[LAPTOP])]
#[case::skip_zero(LogFilter { skip_zero_rssi: true, ..LogFilter::default() }, &[PHONE, RANDOMISED])]
#[case::after_is_strict(LogFilter { after: Some(at_secs(100)), ..LogFilter::default() }, &[RANDOMISED, LAPTOP])]
#[case::before_is_strict(LogFilter { before: Some(at_secs(300)), ..LogFilter::default() }, &[PHONE, RANDOMISED])]
fn filters_select_expected_sightings(
    populated: PopulatedLog,
    #[case] filter: LogFilter,
    #[case] expected: &[&str],
) {
    assert_eq!(macs_of(&populated.log, &filter), expected);
}

#[rstest]
fn ignored_addresses_are_excluded(populated: PopulatedLog) {
    let filter = LogFilter {
        ignored: IgnoreFilter::from_entries([PHONE, LAPTOP]).expect("valid entries"),
        ..LogFilter::default()
    };
    assert_eq!(macs_of(&populated.log, &filter), vec![RANDOMISED]);
}

#[rstest]
#[case(false, &[PHONE, RANDOMISED])]
#[case(true, &[PHONE])]
fn macs_for_ssid_honours_privacy(
    populated: PopulatedLog,
    #[case] hide_laa: bool,
    #[case] expected: &[&str],
) {
    let macs: Vec<String> = populated
        .log
        .macs_for_ssid("home", hide_laa)
        .expect("query macs")
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(macs, expected);
}

#[rstest]
fn unknown_ssid_is_reported(populated: PopulatedLog) {
    let err = populated
        .log
        .macs_for_ssid("cafe", false)
        .expect_err("no such ssid");
    assert!(matches!(err, StoreError::UnknownSsid { ssid } if ssid == "cafe"));
}

#[rstest]
fn log_rejects_foreign_databases() {
    let dir = TempDir::new().expect("temp dir");
    let path = utf8_path(&dir, "other.db");
    Connection::open(&path)
        .and_then(|conn| conn.execute_batch("CREATE TABLE unrelated (id INTEGER)"))
        .expect("create foreign database");
    let err = ProbeLog::open(&path).expect_err("not a probe database");
    assert!(matches!(
        err,
        StoreError::Schema(SchemaError::Migration { .. })
    ));
}
