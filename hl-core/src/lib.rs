//! HealthLog Core - Foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by the other HealthLog crates:
//! - Error taxonomy for the storage layer
//! - Application configuration (database and logging settings)
//! - Structured logging with tracing
//! - Platform directories
//! - The database name and schema version constants

pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod constants;

// Re-export commonly used items at the crate root
pub use config::{AppConfig, DatabaseConfig};
pub use error::{HlError, HlResult};
pub use logging::init_logging;
pub use platform::Platform;
