//! Schema version negotiation and versioned migrations.
//!
//! The stored version is read and upgraded inside a single `IMMEDIATE`
//! transaction, so two connections opening the same file never run the same
//! upgrade twice and a failing step leaves the database untouched.
//!
//! A fresh database is created directly at `DB_SCHEMA_VERSION`. An older one
//! runs every step from its stored version upward, in order; each step is
//! keyed by the version it upgrades from and must be safe to re-run.

use rusqlite::{Connection, ErrorCode, TransactionBehavior};
use tracing::{debug, info};
use hl_core::constants::DB_SCHEMA_VERSION;
use hl_core::error::{HlError, HlResult};

use crate::schema;

/// A single upgrade step from `from` to `from + 1`.
pub struct Migration {
    pub from: u32,
    pub description: &'static str,
    pub apply: fn(&Connection) -> rusqlite::Result<()>,
}

/// Ordered upgrade steps. `from` values are contiguous and the last step
/// targets `DB_SCHEMA_VERSION`.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        from: 1,
        description: "add compound health record indices",
        apply: migrate_v1_to_v2,
    },
    Migration {
        from: 2,
        description: "add avatar and active flag to users",
        apply: migrate_v2_to_v3,
    },
];

/// What `upgrade` did to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// No schema existed; it was created at the current version.
    Created,
    /// The stored version already matched.
    UpToDate,
    /// Steps were applied from the stored version up to the current one.
    Migrated { from: u32, to: u32 },
}

/// Bring the database to `DB_SCHEMA_VERSION`.
///
/// Fails with `DatabaseBlocked` if another connection holds the write lock
/// past the busy timeout, and with `SchemaDowngrade` if the stored version is
/// newer than this build.
pub fn upgrade(conn: &mut Connection) -> HlResult<UpgradeOutcome> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(lock_error)?;

    let outcome = match stored_version(&tx).map_err(|e| HlError::Connection(e.to_string()))? {
        None => {
            schema::create_tables(&tx)?;
            set_schema_version(&tx, DB_SCHEMA_VERSION)?;
            info!("created database schema at version {DB_SCHEMA_VERSION}");
            UpgradeOutcome::Created
        }
        Some(stored) if stored > DB_SCHEMA_VERSION => {
            return Err(HlError::SchemaDowngrade {
                stored,
                supported: DB_SCHEMA_VERSION,
            });
        }
        Some(stored) if stored == DB_SCHEMA_VERSION => {
            debug!("database schema is up to date (version {stored})");
            UpgradeOutcome::UpToDate
        }
        Some(stored) => {
            info!("running migrations from version {stored} to {DB_SCHEMA_VERSION}");
            run_steps(&tx, stored)?;
            UpgradeOutcome::Migrated {
                from: stored,
                to: DB_SCHEMA_VERSION,
            }
        }
    };

    tx.commit().map_err(lock_error)?;
    Ok(outcome)
}

/// Apply every step whose `from` is at or above `stored`, in order.
fn run_steps(conn: &Connection, stored: u32) -> HlResult<()> {
    let mut version = stored;
    for step in MIGRATIONS.iter().filter(|m| m.from >= stored) {
        if step.from != version {
            return Err(HlError::Migration(format!(
                "no migration step from version {version}"
            )));
        }
        info!("applying migration {} -> {}: {}", step.from, step.from + 1, step.description);
        (step.apply)(conn).map_err(|e| {
            HlError::Migration(format!("step {} -> {} failed: {e}", step.from, step.from + 1))
        })?;
        version = step.from + 1;
        set_schema_version(conn, version)?;
    }

    if version != DB_SCHEMA_VERSION {
        return Err(HlError::Migration(format!(
            "migrations stopped at version {version}, expected {DB_SCHEMA_VERSION}"
        )));
    }
    info!("migrations complete, schema at version {DB_SCHEMA_VERSION}");
    Ok(())
}

/// Read the stored schema version. `None` means no schema has been created.
pub fn stored_version(conn: &Connection) -> rusqlite::Result<Option<u32>> {
    if !schema::table_exists(conn, "schema_version")? {
        return Ok(None);
    }
    let version: Option<u32> = match conn.query_row(
        "SELECT version FROM schema_version LIMIT 1",
        [],
        |row| row.get(0),
    ) {
        Ok(v) => Some(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => None,
        Err(e) => return Err(e),
    };
    Ok(version.filter(|v| *v > 0))
}

/// Replace every collection with an empty schema at `DB_SCHEMA_VERSION`.
///
/// Runs on the caller's connection so it commits or rolls back with the
/// surrounding transaction.
pub(crate) fn recreate(conn: &Connection) -> HlResult<()> {
    schema::drop_tables(conn)?;
    schema::create_tables(conn)?;
    set_schema_version(conn, DB_SCHEMA_VERSION)
}

/// Write the stored schema version.
fn set_schema_version(conn: &Connection, version: u32) -> HlResult<()> {
    let write = || -> rusqlite::Result<()> {
        conn.execute("DELETE FROM schema_version", [])?;
        conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
        Ok(())
    };
    write().map_err(|e| HlError::Migration(format!("failed to record version {version}: {e}")))
}

/// Map a failure to take or release the write lock.
fn lock_error(e: rusqlite::Error) -> HlError {
    match e.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
            HlError::DatabaseBlocked(format!("schema upgrade is waiting on another connection: {e}"))
        }
        _ => HlError::Connection(e.to_string()),
    }
}

/// v1 -> v2: compound indices for per-user type and date queries.
fn migrate_v1_to_v2(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_health_records_user_type
             ON health_records(user_id, record_type);
         CREATE INDEX IF NOT EXISTS idx_health_records_user_created
             ON health_records(user_id, created_at);",
    )
}

/// v2 -> v3: avatar and active flag on users, plus the ordering index.
fn migrate_v2_to_v3(conn: &Connection) -> rusqlite::Result<()> {
    if !schema::column_exists(conn, "users", "avatar_url")? {
        conn.execute_batch("ALTER TABLE users ADD COLUMN avatar_url TEXT;")?;
    }
    if !schema::column_exists(conn, "users", "is_active")? {
        conn.execute_batch("ALTER TABLE users ADD COLUMN is_active INTEGER NOT NULL DEFAULT 0;")?;
    }
    conn.execute_batch("CREATE INDEX IF NOT EXISTS idx_users_created_at ON users(created_at, id);")
}

/// Schema as shipped at version 1. Used to exercise the upgrade path.
#[cfg(test)]
pub(crate) const V1_SCHEMA_SQL: &str = r#"
CREATE TABLE schema_version (version INTEGER NOT NULL);
INSERT INTO schema_version (version) VALUES (1);
CREATE TABLE users (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE TABLE settings (
    id TEXT PRIMARY KEY NOT NULL,
    last_user_id TEXT,
    updated_at INTEGER NOT NULL
);
CREATE TABLE health_records (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    record_type TEXT NOT NULL,
    payload TEXT NOT NULL DEFAULT '{}',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX idx_health_records_user_id ON health_records(user_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn index_count(conn: &Connection) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'",
            [],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_migration_steps_are_contiguous() {
        for (i, step) in MIGRATIONS.iter().enumerate() {
            assert_eq!(step.from, i as u32 + 1);
        }
        let last = MIGRATIONS.last().unwrap();
        assert_eq!(last.from + 1, DB_SCHEMA_VERSION);
    }

    #[test]
    fn test_fresh_db_is_created_at_current_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(upgrade(&mut conn).unwrap(), UpgradeOutcome::Created);
        assert_eq!(stored_version(&conn).unwrap(), Some(DB_SCHEMA_VERSION));
    }

    #[test]
    fn test_upgrade_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        upgrade(&mut conn).unwrap();
        assert_eq!(upgrade(&mut conn).unwrap(), UpgradeOutcome::UpToDate);
        assert_eq!(stored_version(&conn).unwrap(), Some(DB_SCHEMA_VERSION));
    }

    #[test]
    fn test_upgrade_from_v1_preserves_rows() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(V1_SCHEMA_SQL).unwrap();
        conn.execute(
            "INSERT INTO users (id, name, created_at, updated_at) VALUES ('u1', 'Alice', 1, 1)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO health_records (id, user_id, record_type, created_at, updated_at)
             VALUES ('r1', 'u1', 'stool', 5, 5)",
            [],
        )
        .unwrap();

        let outcome = upgrade(&mut conn).unwrap();
        assert_eq!(outcome, UpgradeOutcome::Migrated { from: 1, to: DB_SCHEMA_VERSION });
        assert_eq!(stored_version(&conn).unwrap(), Some(DB_SCHEMA_VERSION));

        let (name, active): (String, bool) = conn
            .query_row("SELECT name, is_active FROM users WHERE id = 'u1'", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(name, "Alice");
        assert!(!active);

        let records: i64 = conn
            .query_row("SELECT COUNT(*) FROM health_records", [], |row| row.get(0))
            .unwrap();
        assert_eq!(records, 1);

        // Same indices as a fresh database.
        let mut fresh = Connection::open_in_memory().unwrap();
        upgrade(&mut fresh).unwrap();
        assert_eq!(index_count(&conn), index_count(&fresh));
    }

    #[test]
    fn test_newer_stored_version_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        upgrade(&mut conn).unwrap();
        conn.execute("UPDATE schema_version SET version = ?1", [DB_SCHEMA_VERSION + 1])
            .unwrap();

        match upgrade(&mut conn) {
            Err(HlError::SchemaDowngrade { stored, supported }) => {
                assert_eq!(stored, DB_SCHEMA_VERSION + 1);
                assert_eq!(supported, DB_SCHEMA_VERSION);
            }
            other => panic!("expected SchemaDowngrade, got {other:?}"),
        }
        // The rejected upgrade changed nothing.
        assert_eq!(stored_version(&conn).unwrap(), Some(DB_SCHEMA_VERSION + 1));
    }

    #[test]
    fn test_failed_step_rolls_back() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(V1_SCHEMA_SQL).unwrap();
        // Break the v2 -> v3 step: users is no longer a table.
        conn.execute_batch("DROP TABLE users; CREATE VIEW users AS SELECT 1 AS id;")
            .unwrap();

        let err = upgrade(&mut conn).unwrap_err();
        assert!(matches!(err, HlError::Migration(_)), "got {err:?}");
        assert_eq!(stored_version(&conn).unwrap(), Some(1));
        let compound: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'idx_health_records_user_type'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(compound, 0, "v1 -> v2 step must be rolled back too");
    }
}
