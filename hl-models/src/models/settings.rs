//! Settings singleton entity model.
//!
//! There is exactly one settings row, stored under `SETTINGS_ID`. It is
//! created lazily with defaults and never deleted.

use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Deserializer, Serialize};
use hl_core::constants::SETTINGS_ID;
use hl_core::error::HlResult;

use crate::schema::Collection;
use crate::store::Entity;

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub id: String,
    /// The user selected most recently. Not checked against the users collection.
    pub last_user_id: Option<String>,
    pub updated_at: i64,
}

/// Partial update for the settings singleton.
///
/// `lastUserId` absent leaves the selection alone, `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(deserialize_with = "deserialize_patch_field", skip_serializing_if = "Option::is_none")]
    pub last_user_id: Option<Option<String>>,
}

impl SettingsPatch {
    /// Patch that selects `user_id`.
    pub fn select_user(user_id: impl Into<String>) -> Self {
        Self { last_user_id: Some(Some(user_id.into())) }
    }

    /// Patch that clears the selected user.
    pub fn clear_user() -> Self {
        Self { last_user_id: Some(None) }
    }
}

/// A present field, `null` included, becomes `Some`.
fn deserialize_patch_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl Settings {
    /// Default settings stamped with `now`.
    pub fn default_at(now: i64) -> Self {
        Self {
            id: SETTINGS_ID.to_string(),
            last_user_id: None,
            updated_at: now,
        }
    }

    /// Merge a patch and stamp `updated_at`.
    pub fn apply(&mut self, patch: SettingsPatch, now: i64) {
        if let Some(user_id) = patch.last_user_id {
            self.last_user_id = user_id;
        }
        self.updated_at = now;
    }
}

impl Entity for Settings {
    const COLLECTION: Collection = Collection::Settings;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            last_user_id: row.get("last_user_id")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn to_columns(&self) -> HlResult<Vec<(&'static str, Value)>> {
        Ok(vec![
            ("id", Value::Text(self.id.clone())),
            ("last_user_id", self.last_user_id.clone().map_or(Value::Null, Value::Text)),
            ("updated_at", Value::Integer(self.updated_at)),
        ])
    }
}
