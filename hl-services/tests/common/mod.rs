//! Shared test utilities for integration tests.

#![allow(dead_code)]

use std::path::Path;

use hl_core::config::DatabaseConfig;
use hl_models::Database;
use hl_services::{DbService, HealthRecordService, SettingsService, UserService};
use rusqlite::Connection;
use tempfile::TempDir;

/// Create a temporary database at the current schema version.
/// Returns the Database and the TempDir (must be held alive for the duration of the test).
pub fn create_test_db() -> (Database, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("test.db");
    let config = DatabaseConfig::default();
    let db = Database::init(&path, &config).expect("failed to init test database");
    (db, dir)
}

/// Create a DbService over a temporary file. Nothing is opened until first use.
pub fn create_test_service() -> (DbService, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let service = DbService::new(dir.path().join("test.db"), DatabaseConfig::default());
    (service, dir)
}

/// The three entity accessors sharing one DbService.
pub struct Accessors {
    pub users: UserService,
    pub settings: SettingsService,
    pub records: HealthRecordService,
}

pub fn accessors(db: &DbService) -> Accessors {
    Accessors {
        users: UserService::new(db.clone()),
        settings: SettingsService::new(db.clone()),
        records: HealthRecordService::new(db.clone()),
    }
}

/// Config that gives up on a held write lock quickly.
pub fn impatient_config() -> DatabaseConfig {
    DatabaseConfig {
        busy_timeout_ms: 100,
        connection_timeout_ms: 2_000,
        ..DatabaseConfig::default()
    }
}

/// Schema as shipped at version 1: no compound indices, no avatar or
/// active flag on users.
const V1_SCHEMA: &str = r#"
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

/// Changes shipped at version 2.
const V2_CHANGES: &str = r#"
CREATE INDEX idx_health_records_user_type ON health_records(user_id, record_type);
CREATE INDEX idx_health_records_user_created ON health_records(user_id, created_at);
UPDATE schema_version SET version = 2;
"#;

/// Write a database file at an older schema `version` (1 or 2), seeded with
/// two users, settings and three records.
pub fn write_legacy_db(path: &Path, version: u32) {
    let conn = Connection::open(path).expect("failed to open fixture");
    conn.execute_batch(V1_SCHEMA).expect("failed to create v1 schema");
    if version >= 2 {
        conn.execute_batch(V2_CHANGES).expect("failed to apply v2 changes");
    }
    conn.execute_batch(
        r#"
        INSERT INTO users (id, name, created_at, updated_at) VALUES ('u1', 'Alice', 100, 100);
        INSERT INTO users (id, name, created_at, updated_at) VALUES ('u2', 'Bob', 200, 200);
        INSERT INTO settings (id, last_user_id, updated_at) VALUES ('app', 'u1', 300);
        INSERT INTO health_records (id, user_id, record_type, payload, created_at, updated_at)
            VALUES ('r1', 'u1', 'stool', '{"bristol":4}', 1000, 1000);
        INSERT INTO health_records (id, user_id, record_type, payload, created_at, updated_at)
            VALUES ('r2', 'u1', 'meal', '{"items":["toast"]}', 2000, 2000);
        INSERT INTO health_records (id, user_id, record_type, payload, created_at, updated_at)
            VALUES ('r3', 'u2', 'stool', '{}', 3000, 3000);
        "#,
    )
    .expect("failed to seed fixture");
}

/// Names of every index on the given table.
pub fn index_names(conn: &Connection, table: &str) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = ?1 AND sql IS NOT NULL ORDER BY name")
        .expect("failed to prepare index query");
    stmt.query_map([table], |row| row.get(0))
        .expect("failed to query indices")
        .collect::<rusqlite::Result<Vec<String>>>()
        .expect("failed to read indices")
}

/// Full schema text, for comparing two opens of the same file.
pub fn schema_dump(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT type || ':' || name || ':' || IFNULL(sql, '') FROM sqlite_master ORDER BY type, name")
        .expect("failed to prepare schema query");
    stmt.query_map([], |row| row.get(0))
        .expect("failed to query schema")
        .collect::<rusqlite::Result<Vec<String>>>()
        .expect("failed to read schema")
}
