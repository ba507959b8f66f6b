//! Integration tests for database opening and schema negotiation.
//!
//! Tests fresh creation, repeated opens of the same file, upgrades from
//! older schema versions, downgrade rejection, lock contention, and retry
//! after a failed initialization.

mod common;

use hl_core::config::DatabaseConfig;
use hl_core::constants::DB_SCHEMA_VERSION;
use hl_core::error::HlError;
use hl_models::migrations;
use hl_models::schema::{IDX_RECORDS_USER_CREATED, IDX_RECORDS_USER_ID, IDX_RECORDS_USER_TYPE, IDX_USERS_CREATED_AT};
use hl_models::{store, Database, HealthRecord, Settings, User};
use hl_services::DbService;
use rusqlite::Connection;
use tempfile::TempDir;

// ---- Fresh databases ----

#[test]
fn database_init_creates_file_and_wal_mode() {
    let (db, dir) = common::create_test_db();
    let db_path = dir.path().join("test.db");
    assert!(db_path.exists(), "database file should exist after init");

    let conn = db.conn().unwrap();
    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal_mode.to_lowercase(), "wal", "database should be in WAL mode");
}

#[test]
fn database_init_creates_all_collections_and_indices() {
    let (db, _dir) = common::create_test_db();
    let conn = db.conn().unwrap();

    for table in ["users", "settings", "health_records", "schema_version"] {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1, "table '{table}' should exist");
    }

    assert_eq!(common::index_names(&conn, "users"), [IDX_USERS_CREATED_AT]);
    assert_eq!(
        common::index_names(&conn, "health_records"),
        [IDX_RECORDS_USER_CREATED, IDX_RECORDS_USER_ID, IDX_RECORDS_USER_TYPE]
    );
}

#[test]
fn database_init_records_current_version() {
    let (db, _dir) = common::create_test_db();
    assert_eq!(db.schema_version().unwrap(), DB_SCHEMA_VERSION);
}

#[test]
fn second_init_on_same_file_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tabs.db");
    let config = DatabaseConfig::default();

    let first = Database::init(&path, &config).unwrap();
    first
        .transaction(|conn| {
            store::put(
                conn,
                User {
                    id: "u1".into(),
                    name: "Alice".into(),
                    avatar_url: None,
                    is_active: true,
                    created_at: 1,
                    updated_at: 1,
                },
            )
        })
        .unwrap();
    let before = common::schema_dump(&first.conn().unwrap());

    // A second handle on the same file while the first is still open.
    let second = Database::init(&path, &config).unwrap();
    let after = common::schema_dump(&second.conn().unwrap());

    assert_eq!(before, after);
    assert_eq!(second.schema_version().unwrap(), DB_SCHEMA_VERSION);
    assert_eq!(second.stats().unwrap().users, 1);
}

#[test]
fn upgrade_reports_up_to_date_on_current_schema() {
    let (db, _dir) = common::create_test_db();
    let mut conn = db.conn().unwrap();
    let outcome = migrations::upgrade(&mut conn).unwrap();
    assert_eq!(outcome, migrations::UpgradeOutcome::UpToDate);
}

// ---- Upgrades from older versions ----

fn assert_legacy_rows_survived(db: &Database) {
    let conn = db.conn().unwrap();

    let alice = store::get::<User>(&conn, "u1").unwrap().unwrap();
    assert_eq!(alice.name, "Alice");
    assert_eq!(alice.created_at, 100);
    assert_eq!(alice.avatar_url, None);
    assert!(!alice.is_active, "new active flag should default to false");

    let bob = store::get::<User>(&conn, "u2").unwrap().unwrap();
    assert_eq!(bob.name, "Bob");

    let settings = store::get::<Settings>(&conn, "app").unwrap().unwrap();
    assert_eq!(settings.last_user_id.as_deref(), Some("u1"));

    let record = store::get::<HealthRecord>(&conn, "r2").unwrap().unwrap();
    assert_eq!(record.record_type, "meal");
    assert_eq!(record.payload["items"][0], "toast");

    let stats = db.stats().unwrap();
    assert_eq!(stats.users, 2);
    assert_eq!(stats.settings, 1);
    assert_eq!(stats.health_records, 3);
}

#[test]
fn upgrade_from_v1_preserves_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("v1.db");
    common::write_legacy_db(&path, 1);

    let db = Database::init(&path, &DatabaseConfig::default()).unwrap();
    assert_eq!(db.schema_version().unwrap(), DB_SCHEMA_VERSION);
    assert_legacy_rows_survived(&db);

    let conn = db.conn().unwrap();
    assert_eq!(common::index_names(&conn, "users"), [IDX_USERS_CREATED_AT]);
    assert_eq!(common::index_names(&conn, "health_records").len(), 3);
}

#[test]
fn upgrade_from_v2_preserves_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("v2.db");
    common::write_legacy_db(&path, 2);

    let db = Database::init(&path, &DatabaseConfig::default()).unwrap();
    assert_eq!(db.schema_version().unwrap(), DB_SCHEMA_VERSION);
    assert_legacy_rows_survived(&db);
}

#[test]
fn upgraded_database_supports_new_columns() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("v1.db");
    common::write_legacy_db(&path, 1);

    let db = Database::init(&path, &DatabaseConfig::default()).unwrap();
    let mut alice = db
        .transaction(|conn| Ok(store::get::<User>(conn, "u1")?.unwrap()))
        .unwrap();
    alice.avatar_url = Some("https://example.com/a.png".into());
    alice.is_active = true;
    db.transaction(|conn| store::put(conn, alice.clone())).unwrap();

    let conn = db.conn().unwrap();
    assert_eq!(store::get::<User>(&conn, "u1").unwrap(), Some(alice));
}

// ---- Failures ----

#[test]
fn newer_stored_version_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("future.db");
    let config = DatabaseConfig::default();

    {
        let db = Database::init(&path, &config).unwrap();
        db.conn()
            .unwrap()
            .execute("UPDATE schema_version SET version = 99", [])
            .unwrap();
    }

    let err = Database::init(&path, &config).err().expect("init should fail");
    assert!(
        matches!(err, HlError::SchemaDowngrade { stored: 99, supported } if supported == DB_SCHEMA_VERSION),
        "unexpected error: {err}"
    );
    assert!(err.is_init_failure());

    let conn = Connection::open(&path).unwrap();
    assert_eq!(migrations::stored_version(&conn).unwrap(), Some(99));
}

#[test]
fn held_write_lock_blocks_init() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("locked.db");
    drop(Database::init(&path, &DatabaseConfig::default()).unwrap());

    let holder = Connection::open(&path).unwrap();
    holder.execute_batch("BEGIN IMMEDIATE;").unwrap();

    let err = Database::init(&path, &common::impatient_config())
        .err()
        .expect("init should be blocked");
    assert!(matches!(err, HlError::DatabaseBlocked(_)), "unexpected error: {err}");
    assert!(err.is_init_failure());

    holder.execute_batch("COMMIT;").unwrap();
    let db = Database::init(&path, &common::impatient_config()).unwrap();
    assert_eq!(db.schema_version().unwrap(), DB_SCHEMA_VERSION);
}

#[tokio::test]
async fn failed_init_is_retried_by_service() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("retry.db");
    drop(Database::init(&path, &DatabaseConfig::default()).unwrap());

    let holder = Connection::open(&path).unwrap();
    holder.execute_batch("BEGIN IMMEDIATE;").unwrap();

    let service = DbService::new(&path, common::impatient_config());
    let err = service.init_db().await.err().expect("init should be blocked");
    assert!(matches!(err, HlError::DatabaseBlocked(_)), "unexpected error: {err}");
    assert!(!service.is_initialized());

    holder.execute_batch("COMMIT;").unwrap();
    service.init_db().await.unwrap();
    assert!(service.is_initialized());
}

// ---- Memoized service ----

#[tokio::test]
async fn concurrent_init_shares_one_handle() {
    let (service, _dir) = common::create_test_service();
    let other = service.clone();

    let (a, b) = tokio::join!(service.init_db(), other.init_db());
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(std::ptr::eq(a, b), "both callers should see the same database");

    let again = service.init_db().await.unwrap();
    assert!(std::ptr::eq(a, again));
}

#[tokio::test]
async fn service_from_config_uses_configured_path() {
    let dir = TempDir::new().unwrap();
    let mut config = hl_core::config::AppConfig::default();
    config.database.path = dir.path().join("configured.db").to_string_lossy().into_owned();

    let service = DbService::from_config(&config).unwrap();
    service.init_db().await.unwrap();
    assert!(dir.path().join("configured.db").exists());
}

// ---- Maintenance ----

#[test]
fn reset_drops_data_and_keeps_version() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("v1.db");
    common::write_legacy_db(&path, 1);

    let db = Database::init(&path, &DatabaseConfig::default()).unwrap();
    assert_eq!(db.stats().unwrap().health_records, 3);

    db.reset().unwrap();
    let stats = db.stats().unwrap();
    assert_eq!((stats.users, stats.settings, stats.health_records), (0, 0, 0));
    assert_eq!(db.schema_version().unwrap(), DB_SCHEMA_VERSION);
}

#[test]
fn integrity_check_passes_on_fresh_database() {
    let (db, _dir) = common::create_test_db();
    db.run_integrity_check().unwrap();
}
