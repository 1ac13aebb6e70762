#![forbid(unsafe_code)]

use camino::Utf8Path;
use chrono::{DateTime, TimeZone, Utc};
use probemon_core::{IgnoreFilter, MacAddress, timestamp_secs};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params_from_iter, types::Value};
use serde::Serialize;

use super::{StoreError, schema::verify_schema};

/// Selection applied when reading sightings back.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    /// Keep addresses starting with any of these (lower-case, colon form).
    /// A full 17-character address matches exactly.
    pub mac_prefixes: Vec<String>,
    /// Keep sightings strictly stronger than this.
    pub rssi_above: Option<i8>,
    /// Keep sightings strictly after this instant.
    pub after: Option<DateTime<Utc>>,
    /// Keep sightings strictly before this instant.
    pub before: Option<DateTime<Utc>>,
    /// Drop sightings whose RSSI is zero (no signal reported).
    pub skip_zero_rssi: bool,
    /// Drop these addresses.
    pub ignored: IgnoreFilter,
}

/// One persisted sighting joined with its vendor and SSID names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sighting {
    /// Capture time.
    pub timestamp: DateTime<Utc>,
    /// Transmitter address.
    pub mac: MacAddress,
    /// Manufacturer display name.
    pub vendor: String,
    /// Stored SSID (possibly `b64_`-encoded).
    pub ssid: String,
    /// Signal strength in dBm.
    pub rssi: i8,
}

/// Read-only access to a capture database.
#[derive(Debug)]
pub struct ProbeLog {
    connection: Connection,
}

impl ProbeLog {
    /// Open an existing database read-only and check its schema version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] when the file cannot be opened and
    /// [`StoreError::Schema`] when it is not a probemon database of this
    /// version.
    pub fn open(path: &Utf8Path) -> Result<Self, StoreError> {
        let connection = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(connection)
    }

    /// Wrap an open connection, checking its schema version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Schema`] when the schema version does not match.
    pub fn from_connection(connection: Connection) -> Result<Self, StoreError> {
        verify_schema(&connection)?;
        Ok(Self { connection })
    }

    /// Sightings matching `filter`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] when the query fails and
    /// [`StoreError::CorruptRow`] when a stored address or RSSI is invalid.
    pub fn sightings(&self, filter: &LogFilter) -> Result<Vec<Sighting>, StoreError> {
        let mut clauses = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if !filter.mac_prefixes.is_empty() {
            let alternatives: Vec<&str> = filter
                .mac_prefixes
                .iter()
                .map(|prefix| {
                    let prefix = prefix.to_ascii_lowercase();
                    params.push(Value::Text(like_pattern(&prefix, prefix.len() == 17)));
                    "mac.address LIKE ? ESCAPE '\\'"
                })
                .collect();
            clauses.push(format!("({})", alternatives.join(" OR ")));
        }
        if let Some(rssi) = filter.rssi_above {
            clauses.push("probe.rssi > ?".to_owned());
            params.push(Value::Integer(i64::from(rssi)));
        }
        if let Some(after) = &filter.after {
            clauses.push("probe.timestamp > ?".to_owned());
            params.push(Value::Real(timestamp_secs(after)));
        }
        if let Some(before) = &filter.before {
            clauses.push("probe.timestamp < ?".to_owned());
            params.push(Value::Real(timestamp_secs(before)));
        }
        if filter.skip_zero_rssi {
            clauses.push("probe.rssi != 0".to_owned());
        }
        if !filter.ignored.is_empty() {
            let placeholders = vec!["?"; filter.ignored.len()].join(", ");
            clauses.push(format!("mac.address NOT IN ({placeholders})"));
            params.extend(filter.ignored.iter().map(|mac| Value::Text(mac.to_string())));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT probe.timestamp, mac.address, vendor.name, ssid.name, probe.rssi
             FROM probe
             JOIN mac ON mac.id = probe.mac_id
             JOIN vendor ON vendor.id = mac.vendor_id
             JOIN ssid ON ssid.id = probe.ssid_id
             {where_clause}
             ORDER BY probe.timestamp"
        );

        let rows = self
            .connection
            .prepare(&sql)
            .and_then(|mut statement| {
                statement
                    .query_map(params_from_iter(params), |row| {
                        Ok((
                            row.get::<_, f64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, i64>(4)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()
            })
            .map_err(|source| StoreError::Sqlite {
                operation: "query sightings",
                source,
            })?;

        rows.into_iter()
            .map(|(timestamp, address, vendor, ssid, rssi)| {
                Ok(Sighting {
                    timestamp: from_timestamp_secs(timestamp)?,
                    mac: parse_address(&address)?,
                    vendor,
                    ssid,
                    rssi: i8::try_from(rssi).map_err(|_| StoreError::CorruptRow {
                        detail: format!("RSSI {rssi} out of range"),
                    })?,
                })
            })
            .collect()
    }

    /// Addresses that probed for the SSID stored as `ssid`, in first-seen
    /// order. With `hide_laa`, locally administered addresses are omitted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownSsid`] when no such SSID was recorded and
    /// [`StoreError::Sqlite`] when a query fails.
    pub fn macs_for_ssid(&self, ssid: &str, hide_laa: bool) -> Result<Vec<MacAddress>, StoreError> {
        let ssid_id: i64 = self
            .connection
            .query_row("SELECT id FROM ssid WHERE name = ?1", [ssid], |row| row.get(0))
            .optional()
            .map_err(|source| StoreError::Sqlite {
                operation: "select ssid",
                source,
            })?
            .ok_or_else(|| StoreError::UnknownSsid {
                ssid: ssid.to_owned(),
            })?;

        let addresses = self
            .connection
            .prepare(
                "SELECT mac.address FROM probe
                 JOIN mac ON mac.id = probe.mac_id
                 WHERE probe.ssid_id = ?1
                 GROUP BY mac.id
                 ORDER BY MIN(probe.timestamp)",
            )
            .and_then(|mut statement| {
                statement
                    .query_map([ssid_id], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()
            })
            .map_err(|source| StoreError::Sqlite {
                operation: "query macs for ssid",
                source,
            })?;

        let macs = addresses
            .iter()
            .map(|address| parse_address(address))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(macs
            .into_iter()
            .filter(|mac| !(hide_laa && mac.is_locally_administered()))
            .collect())
    }
}

fn parse_address(address: &str) -> Result<MacAddress, StoreError> {
    address.parse().map_err(|_| StoreError::CorruptRow {
        detail: format!("invalid MAC address {address:?}"),
    })
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "stored timestamps are seconds since the epoch, far inside i64 microseconds"
)]
fn from_timestamp_secs(timestamp: f64) -> Result<DateTime<Utc>, StoreError> {
    let micros = (timestamp * 1_000_000.0).round() as i64;
    Utc.timestamp_micros(micros)
        .single()
        .ok_or_else(|| StoreError::CorruptRow {
            detail: format!("timestamp {timestamp} out of range"),
        })
}

/// `LIKE` pattern matching `prefix` literally, open-ended unless `exact`.
fn like_pattern(prefix: &str, exact: bool) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    if !exact {
        pattern.push('%');
    }
    pattern
}
