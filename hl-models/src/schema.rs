//! Database schema definitions and table creation.
//!
//! Each entity collection is a table keyed by a text `id`. Secondary indices
//! are plain SQLite indices; `INDEXES` registers them by name so the generic
//! store can run index-range queries against them.

use rusqlite::Connection;
use hl_core::error::{HlError, HlResult};
use tracing::info;

/// The entity collections held by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Users,
    Settings,
    HealthRecords,
}

impl Collection {
    /// All collections, in creation order.
    pub const ALL: [Collection; 3] = [Self::Users, Self::Settings, Self::HealthRecords];

    /// SQL table backing this collection.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Settings => "settings",
            Self::HealthRecords => "health_records",
        }
    }

    /// Collection name as seen by callers and in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Settings => "settings",
            Self::HealthRecords => "healthRecords",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub const IDX_USERS_CREATED_AT: &str = "idx_users_created_at";
pub const IDX_RECORDS_USER_ID: &str = "idx_health_records_user_id";
pub const IDX_RECORDS_USER_TYPE: &str = "idx_health_records_user_type";
pub const IDX_RECORDS_USER_CREATED: &str = "idx_health_records_user_created";

/// A named secondary index over one collection.
#[derive(Debug, Clone, Copy)]
pub struct IndexDef {
    pub name: &'static str,
    pub collection: Collection,
    /// Indexed columns, most significant first.
    pub columns: &'static [&'static str],
}

/// Every secondary index in the current schema.
pub const INDEXES: &[IndexDef] = &[
    IndexDef {
        name: IDX_USERS_CREATED_AT,
        collection: Collection::Users,
        columns: &["created_at", "id"],
    },
    IndexDef {
        name: IDX_RECORDS_USER_ID,
        collection: Collection::HealthRecords,
        columns: &["user_id"],
    },
    IndexDef {
        name: IDX_RECORDS_USER_TYPE,
        collection: Collection::HealthRecords,
        columns: &["user_id", "record_type"],
    },
    IndexDef {
        name: IDX_RECORDS_USER_CREATED,
        collection: Collection::HealthRecords,
        columns: &["user_id", "created_at"],
    },
];

/// Look up a registered index by name.
pub fn find_index(name: &str) -> Option<&'static IndexDef> {
    INDEXES.iter().find(|idx| idx.name == name)
}

/// Create all tables and indexes of the current schema if they do not exist.
pub fn create_tables(conn: &Connection) -> HlResult<()> {
    conn.execute_batch(SCHEMA_SQL)
        .map_err(|e| HlError::Migration(format!("failed to create schema: {e}")))?;
    info!("database schema created");
    Ok(())
}

/// Drop all tables (used for database reset).
pub fn drop_tables(conn: &Connection) -> HlResult<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS health_records;
         DROP TABLE IF EXISTS settings;
         DROP TABLE IF EXISTS users;
         DROP TABLE IF EXISTS schema_version;",
    )
    .map_err(|e| HlError::TransactionAborted(format!("failed to drop tables: {e}")))?;
    Ok(())
}

/// Whether a table exists in the database.
pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Whether a column exists on a table.
pub fn column_exists(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names.iter().any(|name| name == column))
}

/// Complete SQL schema at the current version.
const SCHEMA_SQL: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

-- User profiles
CREATE TABLE IF NOT EXISTS users (
    id              TEXT PRIMARY KEY NOT NULL,
    name            TEXT NOT NULL,
    avatar_url      TEXT,
    is_active       INTEGER NOT NULL DEFAULT 0,
    created_at      INTEGER NOT NULL,
    updated_at      INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_created_at ON users(created_at, id);

-- Settings singleton
CREATE TABLE IF NOT EXISTS settings (
    id              TEXT PRIMARY KEY NOT NULL,
    last_user_id    TEXT,
    updated_at      INTEGER NOT NULL
);

-- Health records
CREATE TABLE IF NOT EXISTS health_records (
    id              TEXT PRIMARY KEY NOT NULL,
    user_id         TEXT NOT NULL,
    record_type     TEXT NOT NULL,
    payload         TEXT NOT NULL DEFAULT '{}',
    created_at      INTEGER NOT NULL,
    updated_at      INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_health_records_user_id ON health_records(user_id);
CREATE INDEX IF NOT EXISTS idx_health_records_user_type ON health_records(user_id, record_type);
CREATE INDEX IF NOT EXISTS idx_health_records_user_created ON health_records(user_id, created_at);
"#;
