#![forbid(unsafe_code)]

use std::time::{Duration, Instant};

use camino::Utf8Path;
use log::{debug, info, warn};
use probemon_core::{LruCache, MacAddress, ProbeEvent, SsidName};
use rusqlite::{Connection, OptionalExtension};

use super::{
    StoreError,
    clock::{Clock, SystemClock},
    schema::{apply_pragmas, initialise_schema},
};
use crate::fs::ensure_parent_dir;

/// Default time between commits.
pub const DEFAULT_COMMIT_INTERVAL: Duration = Duration::from_secs(60);
/// Default number of MAC and SSID row ids kept in memory.
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

const OPEN_SAVEPOINT: &str = "SAVEPOINT probe_event";
const RELEASE_SAVEPOINT: &str = "RELEASE probe_event";
const ROLLBACK_SAVEPOINT: &str = "ROLLBACK TO probe_event; RELEASE probe_event";

/// Commit cadence and cache sizing for a [`PersistenceBatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatcherConfig {
    /// Time after which the open transaction is committed.
    pub commit_interval: Duration,
    /// Capacity of the MAC row-id cache.
    pub mac_cache_capacity: usize,
    /// Capacity of the SSID row-id cache.
    pub ssid_cache_capacity: usize,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            commit_interval: DEFAULT_COMMIT_INTERVAL,
            mac_cache_capacity: DEFAULT_CACHE_CAPACITY,
            ssid_cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Writes probe events into SQLite inside long-lived transactions.
///
/// One transaction spans many events and is committed once
/// [`BatcherConfig::commit_interval`] has elapsed, which keeps physical writes
/// rare on flash storage. Each event is written inside a savepoint so a
/// failing event leaves no partial rows behind.
///
/// # Examples
/// ```
/// use probemon_data::store::{BatcherConfig, PersistenceBatcher, SystemClock};
/// use rusqlite::Connection;
///
/// let conn = Connection::open_in_memory().expect("create in-memory database");
/// let batcher = PersistenceBatcher::new(conn, BatcherConfig::default(), SystemClock)
///     .expect("prepare database");
/// let first = batcher.get_or_create_vendor("Acme").expect("insert vendor");
/// let again = batcher.get_or_create_vendor("Acme").expect("find vendor");
/// assert_eq!(first, again);
/// batcher.finish().expect("final commit");
/// ```
#[derive(Debug)]
pub struct PersistenceBatcher<C = SystemClock> {
    connection: Connection,
    clock: C,
    commit_interval: Duration,
    last_commit: Instant,
    mac_ids: LruCache<MacAddress, i64>,
    ssid_ids: LruCache<SsidName, i64>,
    commits: u64,
}

impl<C: Clock> PersistenceBatcher<C> {
    /// Open (creating when needed) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the parent directory cannot be created or
    /// the database cannot be opened and prepared.
    pub fn open(path: &Utf8Path, config: BatcherConfig, clock: C) -> Result<Self, StoreError> {
        ensure_parent_dir(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let connection = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        info!("opened probe database {path}");
        Self::new(connection, config, clock)
    }

    /// Prepare `connection` and open the first transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when pragmas, schema creation or `BEGIN` fail.
    pub fn new(
        mut connection: Connection,
        config: BatcherConfig,
        clock: C,
    ) -> Result<Self, StoreError> {
        apply_pragmas(&connection)?;
        initialise_schema(&mut connection)?;
        execute(&connection, "BEGIN", "begin transaction")?;
        let last_commit = clock.now();
        Ok(Self {
            connection,
            clock,
            commit_interval: config.commit_interval,
            last_commit,
            mac_ids: LruCache::new(config.mac_cache_capacity),
            ssid_ids: LruCache::new(config.ssid_cache_capacity),
            commits: 0,
        })
    }

    /// Row id of the vendor called `name`, inserting it when missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] when the lookup or insert fails.
    pub fn get_or_create_vendor(&self, name: &str) -> Result<i64, StoreError> {
        get_or_insert(&self.connection, Dimension::Vendor, name)
    }

    /// Row id of `ssid`, inserting it when missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] when the lookup or insert fails.
    pub fn get_or_create_ssid(&mut self, ssid: &SsidName) -> Result<i64, StoreError> {
        if let Some(id) = self.ssid_ids.get(ssid).copied() {
            return Ok(id);
        }
        let id = get_or_insert(&self.connection, Dimension::Ssid, ssid.as_str())?;
        self.ssid_ids.put(ssid.clone(), id);
        Ok(id)
    }

    /// Row id of `mac`, inserting it with `vendor_id` when missing.
    ///
    /// An existing row keeps the vendor it was created with.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] when the lookup or insert fails, for
    /// instance because `vendor_id` does not exist.
    pub fn get_or_create_mac(
        &mut self,
        mac: MacAddress,
        vendor_id: i64,
    ) -> Result<i64, StoreError> {
        if let Some(id) = self.mac_ids.get(&mac).copied() {
            return Ok(id);
        }
        let address = mac.to_string();
        let existing = self
            .connection
            .prepare_cached("SELECT id FROM mac WHERE address = ?1")
            .and_then(|mut statement| {
                statement
                    .query_row([address.as_str()], |row| row.get::<_, i64>(0))
                    .optional()
            })
            .map_err(|source| StoreError::Sqlite {
                operation: "select mac",
                source,
            })?;
        let id = match existing {
            Some(id) => id,
            None => {
                self.connection
                    .prepare_cached("INSERT INTO mac (address, vendor_id) VALUES (?1, ?2)")
                    .and_then(|mut statement| statement.execute((address.as_str(), vendor_id)))
                    .map_err(|source| StoreError::Sqlite {
                        operation: "insert mac",
                        source,
                    })?;
                self.connection.last_insert_rowid()
            }
        };
        self.mac_ids.put(mac, id);
        Ok(id)
    }

    /// Append one sighting.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] when the insert fails, for instance
    /// because a referenced row does not exist.
    pub fn insert_probe(
        &mut self,
        timestamp: f64,
        mac_id: i64,
        ssid_id: i64,
        rssi: i8,
    ) -> Result<(), StoreError> {
        self.connection
            .prepare_cached(
                "INSERT INTO probe (timestamp, mac_id, ssid_id, rssi) VALUES (?1, ?2, ?3, ?4)",
            )
            .and_then(|mut statement| statement.execute((timestamp, mac_id, ssid_id, rssi)))
            .map(|_| ())
            .map_err(|source| StoreError::Sqlite {
                operation: "insert probe",
                source,
            })
    }

    /// Persist `event`: dimension rows first, then the probe row.
    ///
    /// The commit timer is checked before the event is written. On failure
    /// the event's rows are rolled back, its MAC and SSID are dropped from the
    /// caches and the error is returned; earlier events in the open
    /// transaction are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when any statement fails.
    pub fn record(&mut self, event: &ProbeEvent) -> Result<(), StoreError> {
        self.maybe_commit()?;
        execute(&self.connection, OPEN_SAVEPOINT, "open savepoint")?;
        match self.write_event(event) {
            Ok(()) => execute(&self.connection, RELEASE_SAVEPOINT, "release savepoint"),
            Err(err) => {
                warn!("rolling back probe from {}: {err}", event.mac);
                if let Err(rollback) =
                    execute(&self.connection, ROLLBACK_SAVEPOINT, "roll back savepoint")
                {
                    warn!("savepoint rollback failed: {rollback}");
                }
                self.forget(event.mac, &SsidName::from_bytes(&event.ssid));
                Err(err)
            }
        }
    }

    fn write_event(&mut self, event: &ProbeEvent) -> Result<(), StoreError> {
        let ssid_id = self.get_or_create_ssid(&SsidName::from_bytes(&event.ssid))?;
        let mac_id = match self.mac_ids.get(&event.mac).copied() {
            Some(id) => id,
            None => {
                let vendor_id = self.get_or_create_vendor(event.vendor_or_unknown())?;
                self.get_or_create_mac(event.mac, vendor_id)?
            }
        };
        self.insert_probe(event.timestamp_secs(), mac_id, ssid_id, event.rssi)
    }

    /// Commit and reopen the transaction when the interval has elapsed.
    ///
    /// Returns whether a commit happened.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] when `COMMIT` or `BEGIN` fails.
    pub fn maybe_commit(&mut self) -> Result<bool, StoreError> {
        let now = self.clock.now();
        if now.saturating_duration_since(self.last_commit) < self.commit_interval {
            return Ok(false);
        }
        self.commit_now()?;
        execute(&self.connection, "BEGIN", "begin transaction")?;
        Ok(true)
    }

    fn commit_now(&mut self) -> Result<(), StoreError> {
        execute(&self.connection, "COMMIT", "commit transaction")?;
        self.last_commit = self.clock.now();
        self.commits += 1;
        debug!("committed probe transaction #{}", self.commits);
        Ok(())
    }

    /// Drop the cached row ids of `mac` and `ssid`.
    pub(crate) fn forget(&mut self, mac: MacAddress, ssid: &SsidName) {
        self.mac_ids.remove(&mac);
        self.ssid_ids.remove(ssid);
    }

    /// Number of commits so far.
    #[must_use]
    pub const fn commits(&self) -> u64 {
        self.commits
    }

    /// Underlying connection, for reads inside the open transaction.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Commit outstanding writes and release the database.
    ///
    /// Returns the total number of commits, this one included.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] when the final `COMMIT` fails.
    pub fn finish(mut self) -> Result<u64, StoreError> {
        self.commit_now()?;
        info!("closing probe database after {} commits", self.commits);
        Ok(self.commits)
    }
}

fn execute(connection: &Connection, sql: &str, operation: &'static str) -> Result<(), StoreError> {
    connection
        .execute_batch(sql)
        .map_err(|source| StoreError::Sqlite { operation, source })
}

/// Name-keyed dimension tables sharing the get-or-create pattern.
#[derive(Debug, Clone, Copy)]
enum Dimension {
    Vendor,
    Ssid,
}

impl Dimension {
    const fn select(self) -> (&'static str, &'static str) {
        match self {
            Self::Vendor => ("SELECT id FROM vendor WHERE name = ?1", "select vendor"),
            Self::Ssid => ("SELECT id FROM ssid WHERE name = ?1", "select ssid"),
        }
    }

    const fn insert(self) -> (&'static str, &'static str) {
        match self {
            Self::Vendor => ("INSERT INTO vendor (name) VALUES (?1)", "insert vendor"),
            Self::Ssid => ("INSERT INTO ssid (name) VALUES (?1)", "insert ssid"),
        }
    }
}

fn get_or_insert(
    connection: &Connection,
    dimension: Dimension,
    name: &str,
) -> Result<i64, StoreError> {
    let (select, operation) = dimension.select();
    let existing = connection
        .prepare_cached(select)
        .and_then(|mut statement| {
            statement
                .query_row([name], |row| row.get::<_, i64>(0))
                .optional()
        })
        .map_err(|source| StoreError::Sqlite { operation, source })?;
    if let Some(id) = existing {
        return Ok(id);
    }
    let (insert, operation) = dimension.insert();
    connection
        .prepare_cached(insert)
        .and_then(|mut statement| statement.execute([name]))
        .map_err(|source| StoreError::Sqlite { operation, source })?;
    Ok(connection.last_insert_rowid())
}
