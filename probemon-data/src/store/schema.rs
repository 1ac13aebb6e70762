#![forbid(unsafe_code)]

use rusqlite::{Connection, Error as SqliteError, OptionalExtension, Transaction};
use thiserror::Error;

/// Version recorded in `probemon_schema_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Apply the connection-level settings used for capture databases.
///
/// Writes are batched into long transactions, so the rollback journal is
/// kept in memory and `fsync` is relaxed to `NORMAL`.
///
/// # Errors
///
/// Returns [`SchemaError`] when SQLite rejects a pragma.
pub fn apply_pragmas(connection: &Connection) -> Result<(), SchemaError> {
    connection
        .pragma_update_and_check(None, "journal_mode", "MEMORY", |row| {
            row.get::<_, String>(0)
        })
        .map_err(|source| SchemaError::Pragma {
            pragma: "journal_mode",
            source,
        })?;
    for (pragma, value) in [
        ("synchronous", "NORMAL"),
        ("temp_store", "MEMORY"),
        ("foreign_keys", "ON"),
    ] {
        connection
            .pragma_update(None, pragma, value)
            .map_err(|source| SchemaError::Pragma { pragma, source })?;
    }
    Ok(())
}

/// Create the probe tables and index, and record the schema version.
///
/// Existing databases must already be at [`SCHEMA_VERSION`]; other versions
/// are rejected rather than migrated implicitly.
///
/// # Examples
/// ```
/// use rusqlite::Connection;
/// use probemon_data::store::initialise_schema;
///
/// let mut conn = Connection::open_in_memory().expect("create in-memory database");
/// initialise_schema(&mut conn).expect("create schema");
/// let tables: i64 = conn
///     .query_row(
///         "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('vendor', 'ssid', 'mac', 'probe')",
///         [],
///         |row| row.get(0),
///     )
///     .expect("count tables");
/// assert_eq!(tables, 4);
/// ```
pub fn initialise_schema(connection: &mut Connection) -> Result<(), SchemaError> {
    let transaction = connection
        .transaction()
        .map_err(|source| SchemaError::Migration {
            step: "begin schema transaction",
            source,
        })?;

    create_tables(&transaction)?;
    run_migration_step(
        &transaction,
        "index probe timestamps",
        "CREATE INDEX IF NOT EXISTS idx_probe_timestamp ON probe(timestamp)",
    )?;
    ensure_schema_version(&transaction)?;

    transaction
        .commit()
        .map_err(|source| SchemaError::Migration {
            step: "commit schema transaction",
            source,
        })
}

/// Check the recorded version without creating anything.
///
/// # Errors
///
/// Returns [`SchemaError::Unversioned`] when no version row exists,
/// [`SchemaError::VersionMismatch`] for any other version and
/// [`SchemaError::Migration`] when the version table cannot be read.
pub fn verify_schema(connection: &Connection) -> Result<(), SchemaError> {
    let found: Option<i64> = connection
        .query_row(
            "SELECT version FROM probemon_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| SchemaError::Migration {
            step: "read schema version",
            source,
        })?;
    match found {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(found) => Err(SchemaError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        }),
        None => Err(SchemaError::Unversioned),
    }
}

fn create_tables(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create vendor",
        "CREATE TABLE IF NOT EXISTS vendor (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
    )?;
    run_migration_step(
        transaction,
        "create ssid",
        "CREATE TABLE IF NOT EXISTS ssid (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
    )?;
    run_migration_step(
        transaction,
        "create mac",
        "CREATE TABLE IF NOT EXISTS mac (
            id INTEGER PRIMARY KEY,
            address TEXT NOT NULL UNIQUE,
            vendor_id INTEGER NOT NULL REFERENCES vendor(id)
        )",
    )?;
    run_migration_step(
        transaction,
        "create probe",
        "CREATE TABLE IF NOT EXISTS probe (
            timestamp REAL NOT NULL,
            mac_id INTEGER NOT NULL REFERENCES mac(id),
            ssid_id INTEGER NOT NULL REFERENCES ssid(id),
            rssi INTEGER NOT NULL
        )",
    )
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS probemon_schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0),
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    match verify_schema(transaction) {
        Ok(()) => Ok(()),
        Err(SchemaError::Unversioned) => transaction
            .execute(
                "INSERT INTO probemon_schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(|source| SchemaError::Migration {
                step: "record schema version",
                source,
            }),
        Err(err) => Err(err),
    }
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), SchemaError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| SchemaError::Migration { step, source })
}

/// Errors raised when preparing a capture database.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A connection pragma could not be applied.
    #[error("failed to apply SQLite pragma '{pragma}'")]
    Pragma {
        /// Pragma name.
        pragma: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A schema statement failed.
    #[error("failed to execute migration step '{step}'")]
    Migration {
        /// Label of the failing step.
        step: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// The database was created by an incompatible release.
    #[error(
        "expected probemon schema version {expected} but found {found}; apply migrations before retrying"
    )]
    VersionMismatch {
        /// Version this build understands.
        expected: i64,
        /// Version recorded in the database.
        found: i64,
    },
    /// The database has no recorded schema version.
    #[error("database has no probemon schema version")]
    Unversioned,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn initialising_twice_is_idempotent() {
        let mut conn = Connection::open_in_memory().expect("in-memory database");
        initialise_schema(&mut conn).expect("first run");
        initialise_schema(&mut conn).expect("second run");
        verify_schema(&conn).expect("version recorded");
    }

    #[rstest]
    fn rejects_foreign_versions() {
        let mut conn = Connection::open_in_memory().expect("in-memory database");
        initialise_schema(&mut conn).expect("create schema");
        conn.execute("UPDATE probemon_schema_version SET version = 7", [])
            .expect("tamper version");
        let err = initialise_schema(&mut conn).expect_err("mismatch");
        assert!(matches!(
            err,
            SchemaError::VersionMismatch {
                expected: 1,
                found: 7
            }
        ));
    }

    #[rstest]
    fn unversioned_database_is_reported() {
        let conn = Connection::open_in_memory().expect("in-memory database");
        conn.execute_batch(
            "CREATE TABLE probemon_schema_version (version INTEGER PRIMARY KEY) WITHOUT ROWID",
        )
        .expect("empty version table");
        assert!(matches!(verify_schema(&conn), Err(SchemaError::Unversioned)));
    }

    #[rstest]
    fn pragmas_enable_foreign_keys() {
        let conn = Connection::open_in_memory().expect("in-memory database");
        apply_pragmas(&conn).expect("apply pragmas");
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .expect("read pragma");
        assert_eq!(enabled, 1);
    }
}
