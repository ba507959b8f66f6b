//! Application-wide constants.
//!
//! `DB_NAME` and `DB_SCHEMA_VERSION` are the only copies of the database
//! identity. Tooling that deletes or inspects the database (the `db` CLI
//! commands) reads them from here.

/// Application name.
pub const APP_NAME: &str = "HealthLog";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fixed identifier of the on-device database.
pub const DB_NAME: &str = "healthlog";

/// File name of the on-device database inside the data directory.
pub const DB_FILE_NAME: &str = "healthlog.db";

/// Database schema version. Never decreases between releases and is always
/// at least the target version of the last migration step.
pub const DB_SCHEMA_VERSION: u32 = 3;

/// Well-known id of the settings singleton.
pub const SETTINGS_ID: &str = "app";

/// Well-known health record categories.
pub mod record_types {
    pub const STOOL: &str = "stool";
    pub const SYMPTOM: &str = "symptom";
    pub const MEAL: &str = "meal";
    pub const MEDICATION: &str = "medication";
    pub const NOTE: &str = "note";

    /// All well-known categories. Other non-empty categories are accepted too.
    pub const ALL: &[&str] = &[STOOL, SYMPTOM, MEAL, MEDICATION, NOTE];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_file_name_matches_db_name() {
        assert_eq!(DB_FILE_NAME, format!("{DB_NAME}.db"));
    }

    #[test]
    fn test_record_type_constants() {
        assert_eq!(record_types::ALL.len(), 5);
        assert!(record_types::ALL.contains(&"stool"));
    }
}
