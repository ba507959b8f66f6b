//! HealthLog Models - Database schema, entity models, migrations, and queries.
//!
//! This crate owns all data persistence: SQLite database initialization,
//! schema version negotiation, the generic collection store, the user,
//! settings and health record entities, and the query shapes the services use.

pub mod db;
pub mod schema;
pub mod store;
pub mod models;
pub mod queries;
pub mod migrations;

// Re-export key types
pub use db::{Database, DatabaseStats, DbPool};
pub use schema::Collection;
pub use store::{Entity, Key, KeyBound, KeyPart, KeyRange};
pub use models::{new_id, timestamp_now};
pub use models::user::{NewUser, User, UserPatch};
pub use models::settings::{Settings, SettingsPatch};
pub use models::health_record::{HealthRecord, HealthRecordPatch, NewHealthRecord};
pub use migrations::UpgradeOutcome;
pub use queries::RecordQuery;
