//! HealthLog Services - Entity accessors over the shared database.
//!
//! This crate provides the memoized database service that owns the
//! process-wide handle, and the typed accessors built on it:
//! - Users (list in creation order, add, update, delete)
//! - Settings (lazily created singleton, selected user)
//! - Health records (per-user queries by type and date, CRUD)

pub mod db_service;
pub mod user;
pub mod settings;
pub mod health_record;

// Re-export key types
pub use db_service::DbService;
pub use user::UserService;
pub use settings::SettingsService;
pub use health_record::HealthRecordService;
