//! Database initialization, connection pooling, and lifecycle management.
//!
//! Uses SQLite in WAL mode with r2d2 connection pooling. Opening a database
//! negotiates its schema version before any handle is handed out.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, TransactionBehavior};
use tracing::{error, info, warn};

use hl_core::config::DatabaseConfig;
use hl_core::error::{HlError, HlResult};

use crate::migrations::{self, UpgradeOutcome};
use crate::schema::Collection;
use crate::store;

/// Type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// An open database at the current schema version.
#[derive(Clone)]
pub struct Database {
    pool: Arc<DbPool>,
    path: PathBuf,
}

impl Database {
    /// Open (or create) the database at `db_path` and bring its schema to
    /// the current version.
    ///
    /// Fails with `DatabaseBlocked` when another connection holds the write
    /// lock past the busy timeout, and with `SchemaDowngrade` when the file
    /// was written by a newer build. Nothing is changed on failure.
    pub fn init(db_path: &Path, config: &DatabaseConfig) -> HlResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                HlError::Connection(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        info!("initializing database at {}", db_path.display());

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(config.pool_size.max(1))
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms))
            .connection_customizer(Box::new(ConnectionCustomizer {
                wal_mode: config.wal_mode,
                busy_timeout: Duration::from_millis(config.busy_timeout_ms),
            }))
            .build(manager)
            .map_err(|e| HlError::Connection(e.to_string()))?;

        let db = Self {
            pool: Arc::new(pool),
            path: db_path.to_path_buf(),
        };

        {
            let mut conn = db
                .pool
                .get()
                .map_err(|e| HlError::Connection(e.to_string()))?;
            match migrations::upgrade(&mut conn)? {
                UpgradeOutcome::Created => info!("created new database"),
                UpgradeOutcome::UpToDate => info!("database schema is current"),
                UpgradeOutcome::Migrated { from, to } => {
                    info!("database upgraded from version {from} to {to}")
                }
            }
        }

        if config.integrity_check_on_startup {
            db.run_integrity_check()?;
        }

        info!("database initialized successfully");
        Ok(db)
    }

    /// Get a connection from the pool.
    ///
    /// The database is already open, so a checkout that times out aborts the
    /// operation at hand rather than reporting a failed open.
    pub fn conn(&self) -> HlResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| HlError::TransactionAborted(format!("no database connection available: {e}")))
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a SQLite integrity check.
    pub fn run_integrity_check(&self) -> HlResult<()> {
        let conn = self.conn()?;
        let result: String = conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))
            .map_err(|e| HlError::IntegrityCheck(e.to_string()))?;

        if result != "ok" {
            error!("database integrity check failed: {result}");
            return Err(HlError::IntegrityCheck(result));
        }

        info!("database integrity check passed");
        Ok(())
    }

    /// Execute a function within a write transaction.
    ///
    /// The write lock is taken up front, so a read-modify-write inside `f`
    /// cannot interleave with another writer. An error from `f` rolls back
    /// everything it did.
    pub fn transaction<T, F>(&self, f: F) -> HlResult<T>
    where
        F: FnOnce(&Connection) -> HlResult<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store::aborted)?;

        let result = f(&tx)?;

        tx.commit().map_err(store::aborted)?;

        Ok(result)
    }

    /// Schema version recorded in the file.
    pub fn schema_version(&self) -> HlResult<u32> {
        let conn = self.conn()?;
        migrations::stored_version(&conn)
            .map_err(|e| HlError::Connection(e.to_string()))?
            .ok_or_else(|| HlError::Internal("schema version missing from an open database".into()))
    }

    /// Row counts per collection.
    pub fn stats(&self) -> HlResult<DatabaseStats> {
        let conn = self.conn()?;
        Ok(DatabaseStats {
            users: store::count(&conn, Collection::Users)?,
            settings: store::count(&conn, Collection::Settings)?,
            health_records: store::count(&conn, Collection::HealthRecords)?,
        })
    }

    /// Drop every collection and recreate an empty schema.
    pub fn reset(&self) -> HlResult<()> {
        warn!("resetting database - all data will be lost");
        self.transaction(migrations::recreate)?;
        info!("database reset complete");
        Ok(())
    }
}

/// Database row count statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStats {
    pub users: i64,
    pub settings: i64,
    pub health_records: i64,
}

impl std::fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "users={}, settings={}, healthRecords={}",
            self.users, self.settings, self.health_records
        )
    }
}

/// r2d2 connection customizer that applies PRAGMA settings.
#[derive(Debug)]
struct ConnectionCustomizer {
    wal_mode: bool,
    busy_timeout: Duration,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        // Set first so the pragmas below also wait on a busy file.
        conn.busy_timeout(self.busy_timeout)?;

        if self.wal_mode {
            conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get::<_, String>(0))?;
        }

        conn.execute_batch(
            "PRAGMA synchronous=NORMAL;
             PRAGMA temp_store=MEMORY;
             PRAGMA cache_size=-16000;",
        )?;

        Ok(())
    }
}
