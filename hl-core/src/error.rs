//! Global error types for the HealthLog storage layer.
//!
//! Every failure the engine and the entity accessors can produce is a
//! variant of `HlError`. Initialization failures (connection, blocked upgrade,
//! schema downgrade, migration) are kept apart from operation failures so
//! callers can tell "not yet initialized" from "operation rejected".

use thiserror::Error;

/// Convenience type alias for Results using HlError.
pub type HlResult<T> = Result<T, HlError>;

/// Unified error type covering all storage error categories.
#[derive(Error, Debug)]
pub enum HlError {
    // -- Entity errors --
    /// The operation targets an entity id that does not exist.
    #[error("{collection} not found: {id}")]
    NotFound {
        /// Collection that was searched.
        collection: &'static str,
        /// Identifier that was not found.
        id: String,
    },

    /// A required field is missing or invalid, or an immutable field was changed.
    #[error("validation error: {0}")]
    Validation(String),

    // -- Initialization errors --
    /// The schema upgrade could not take the write lock because another
    /// connection holds it. Retry once the other connection is closed.
    #[error("database blocked: {0}")]
    DatabaseBlocked(String),

    /// The stored schema version is newer than this build supports.
    #[error("stored schema version {stored} is newer than supported version {supported}")]
    SchemaDowngrade {
        /// Version found in the database.
        stored: u32,
        /// Highest version this build knows about.
        supported: u32,
    },

    /// The database could not be opened or the pool could not be built.
    #[error("connection error: {0}")]
    Connection(String),

    /// A migration step failed. The upgrade was rolled back.
    #[error("migration error: {0}")]
    Migration(String),

    /// Database integrity check failed.
    #[error("database integrity check failed: {0}")]
    IntegrityCheck(String),

    // -- Operation errors --
    /// The underlying store rejected the operation (constraint, I/O, quota...).
    #[error("transaction aborted: {0}")]
    TransactionAborted(String),

    // -- Ambient errors --
    /// Failed to load or parse application configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HlError {
    /// Whether this error was produced while opening or upgrading the database,
    /// as opposed to by an operation on an initialized database.
    pub fn is_init_failure(&self) -> bool {
        matches!(
            self,
            Self::DatabaseBlocked(_)
                | Self::SchemaDowngrade { .. }
                | Self::Connection(_)
                | Self::Migration(_)
                | Self::IntegrityCheck(_)
        )
    }

    /// Build a `NotFound` error for the given collection and id.
    pub fn not_found(collection: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection,
            id: id.into(),
        }
    }
}

impl From<serde_json::Error> for HlError {
    fn from(e: serde_json::Error) -> Self {
        HlError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for HlError {
    fn from(e: toml::de::Error) -> Self {
        HlError::Config(e.to_string())
    }
}
