//! Process-wide database handle with memoized initialization.
//!
//! The first caller of `init_db` opens the database and negotiates its
//! schema; concurrent callers await that same initialization and later
//! callers reuse the handle. A failed initialization is not cached, so the
//! next call tries again.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use hl_core::config::{AppConfig, DatabaseConfig};
use hl_core::error::{HlError, HlResult};
use hl_models::Database;

struct Inner {
    path: PathBuf,
    config: DatabaseConfig,
    cell: OnceCell<Database>,
}

/// Shared owner of the database handle. Cloning is cheap and every clone
/// sees the same handle.
#[derive(Clone)]
pub struct DbService {
    inner: Arc<Inner>,
}

impl DbService {
    /// Create a service for the database at `path`. Nothing is opened yet.
    pub fn new(path: impl Into<PathBuf>, config: DatabaseConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                path: path.into(),
                config,
                cell: OnceCell::new(),
            }),
        }
    }

    /// Create a service from the application config.
    pub fn from_config(config: &AppConfig) -> HlResult<Self> {
        Ok(Self::new(config.effective_db_path()?, config.database.clone()))
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Whether initialization has completed successfully.
    pub fn is_initialized(&self) -> bool {
        self.inner.cell.initialized()
    }

    /// Open the database, running the schema upgrade on first use.
    pub async fn init_db(&self) -> HlResult<&Database> {
        self.inner
            .cell
            .get_or_try_init(|| async {
                let path = self.inner.path.clone();
                let config = self.inner.config.clone();
                let result = tokio::task::spawn_blocking(move || Database::init(&path, &config))
                    .await
                    .map_err(|e| HlError::Internal(format!("database init task failed: {e}")))?;
                if let Err(e) = &result {
                    warn!("database initialization failed: {e}");
                }
                result
            })
            .await
    }

    /// The initialized database handle. Every accessor goes through here.
    pub async fn database(&self) -> HlResult<Database> {
        self.init_db().await.cloned()
    }

    /// Run a blocking closure against the database on the blocking pool.
    pub async fn run<T, F>(&self, f: F) -> HlResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> HlResult<T> + Send + 'static,
    {
        let db = self.database().await?;
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                debug!("database task did not complete: {e}");
                HlError::Internal(format!("database task failed: {e}"))
            })?
    }
}
