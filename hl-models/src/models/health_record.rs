//! Health record entity model.
//!
//! A record belongs to one user (by convention, not by foreign key), has a
//! category string and a free-form JSON object payload whose shape depends on
//! the category.

use rusqlite::types::{Type, Value};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use hl_core::error::{HlError, HlResult};

use crate::schema::Collection;
use crate::store::Entity;

use super::required;

/// A single tracked health event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecord {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub payload: JsonValue,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Caller-supplied fields for a new record. Missing fields deserialize as
/// empty and are rejected by validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewHealthRecord {
    pub user_id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub payload: JsonValue,
}

impl NewHealthRecord {
    pub fn new(user_id: impl Into<String>, record_type: impl Into<String>, payload: JsonValue) -> Self {
        Self {
            user_id: user_id.into(),
            record_type: record_type.into(),
            payload,
        }
    }
}

/// Partial update for a record. `id`, `user_id` and `created_at` may only
/// repeat the stored values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HealthRecordPatch {
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub payload: Option<JsonValue>,
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub created_at: Option<i64>,
}

/// Null becomes `{}`; anything other than an object is rejected.
fn normalize_payload(payload: JsonValue) -> HlResult<JsonValue> {
    match payload {
        JsonValue::Null => Ok(JsonValue::Object(Default::default())),
        JsonValue::Object(_) => Ok(payload),
        other => Err(HlError::Validation(format!(
            "payload must be a JSON object, got {other}"
        ))),
    }
}

impl HealthRecord {
    /// Build a new record with a generated id and both timestamps set to `now`.
    pub fn create(data: NewHealthRecord, id: String, now: i64) -> HlResult<Self> {
        let user_id = required("userId", &data.user_id).map_err(HlError::Validation)?;
        let record_type = required("type", &data.record_type).map_err(HlError::Validation)?;
        Ok(Self {
            id,
            user_id,
            record_type,
            payload: normalize_payload(data.payload)?,
            created_at: now,
            updated_at: now,
        })
    }

    /// Merge a patch and stamp `updated_at`. Leaves `self` untouched on error.
    pub fn apply(&mut self, patch: HealthRecordPatch, now: i64) -> HlResult<()> {
        if patch.id.as_deref().is_some_and(|id| id != self.id) {
            return Err(HlError::Validation("record id cannot be changed".into()));
        }
        if patch.user_id.as_deref().is_some_and(|user| user != self.user_id) {
            return Err(HlError::Validation("record userId cannot be changed".into()));
        }
        if patch.created_at.is_some_and(|at| at != self.created_at) {
            return Err(HlError::Validation("record createdAt cannot be changed".into()));
        }
        let record_type = match patch.record_type {
            Some(t) => Some(required("type", &t).map_err(HlError::Validation)?),
            None => None,
        };
        let payload = patch.payload.map(normalize_payload).transpose()?;

        if let Some(t) = record_type {
            self.record_type = t;
        }
        if let Some(p) = payload {
            self.payload = p;
        }
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for HealthRecord {
    const COLLECTION: Collection = Collection::HealthRecords;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let payload: String = row.get("payload")?;
        let payload = serde_json::from_str(&payload).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
        })?;
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            record_type: row.get("record_type")?,
            payload,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn to_columns(&self) -> HlResult<Vec<(&'static str, Value)>> {
        Ok(vec![
            ("id", Value::Text(self.id.clone())),
            ("user_id", Value::Text(self.user_id.clone())),
            ("record_type", Value::Text(self.record_type.clone())),
            ("payload", Value::Text(serde_json::to_string(&self.payload)?)),
            ("created_at", Value::Integer(self.created_at)),
            ("updated_at", Value::Integer(self.updated_at)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stool() -> HealthRecord {
        HealthRecord::create(
            NewHealthRecord::new("u1", "stool", json!({ "bristol": 4 })),
            "r1".into(),
            100,
        )
        .unwrap()
    }

    #[test]
    fn test_create() {
        let record = stool();
        assert_eq!(record.user_id, "u1");
        assert_eq!(record.record_type, "stool");
        assert_eq!(record.payload["bristol"], 4);
        assert_eq!(record.created_at, 100);
        assert_eq!(record.updated_at, 100);
    }

    #[test]
    fn test_create_requires_user_and_type() {
        let err = HealthRecord::create(NewHealthRecord::new("", "stool", json!({})), "r".into(), 1)
            .unwrap_err();
        assert!(matches!(err, HlError::Validation(ref m) if m.contains("userId")));

        let err = HealthRecord::create(NewHealthRecord::new("u1", " ", json!({})), "r".into(), 1)
            .unwrap_err();
        assert!(matches!(err, HlError::Validation(ref m) if m.contains("type")));
    }

    #[test]
    fn test_missing_fields_from_json_fail_validation() {
        let data: NewHealthRecord = serde_json::from_str(r#"{"type":"meal"}"#).unwrap();
        assert!(HealthRecord::create(data, "r".into(), 1).is_err());
    }

    #[test]
    fn test_payload_defaults_and_must_be_object() {
        let record =
            HealthRecord::create(NewHealthRecord::new("u1", "note", JsonValue::Null), "r".into(), 1)
                .unwrap();
        assert_eq!(record.payload, json!({}));

        let err = HealthRecord::create(NewHealthRecord::new("u1", "note", json!([1, 2])), "r".into(), 1)
            .unwrap_err();
        assert!(matches!(err, HlError::Validation(_)));
    }

    #[test]
    fn test_apply_updates_type_and_payload() {
        let mut record = stool();
        record
            .apply(
                HealthRecordPatch {
                    record_type: Some("symptom".into()),
                    payload: Some(json!({ "severity": 2 })),
                    ..Default::default()
                },
                200,
            )
            .unwrap();
        assert_eq!(record.record_type, "symptom");
        assert_eq!(record.payload, json!({ "severity": 2 }));
        assert_eq!(record.created_at, 100);
        assert_eq!(record.updated_at, 200);
    }

    #[test]
    fn test_apply_rejects_owner_change() {
        let mut record = stool();
        let err = record
            .apply(
                HealthRecordPatch {
                    user_id: Some("u2".into()),
                    payload: Some(json!({ "bristol": 1 })),
                    ..Default::default()
                },
                200,
            )
            .unwrap_err();
        assert!(matches!(err, HlError::Validation(_)));
        assert_eq!(record, stool());
    }

    #[test]
    fn test_type_field_is_named_type_in_json() {
        let json = serde_json::to_value(stool()).unwrap();
        assert_eq!(json["type"], "stool");
        assert_eq!(json["userId"], "u1");
    }
}
