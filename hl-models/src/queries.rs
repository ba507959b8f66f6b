//! Query shaping for the entity accessors.
//!
//! Queries narrow through a secondary index first and finish in memory:
//! filtering, newest-first ordering and the result limit.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use hl_core::error::HlResult;

use crate::models::health_record::HealthRecord;
use crate::models::user::User;
use crate::schema::{IDX_RECORDS_USER_CREATED, IDX_RECORDS_USER_TYPE, IDX_USERS_CREATED_AT};
use crate::store::{self, KeyRange};

/// Filters for a per-user health record query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecordQuery {
    /// Exact record category.
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    /// Inclusive lower bound on `created_at`, epoch milliseconds.
    pub start_date: Option<i64>,
    /// Inclusive upper bound on `created_at`, epoch milliseconds.
    pub end_date: Option<i64>,
    /// Maximum number of records, applied after ordering.
    pub limit: Option<usize>,
}

impl RecordQuery {
    pub fn of_type(record_type: impl Into<String>) -> Self {
        Self {
            record_type: Some(record_type.into()),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn between(mut self, start: i64, end: i64) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    fn has_date_bounds(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }
}

/// All users ordered by `created_at`, ties broken by id.
pub fn list_users(conn: &Connection) -> HlResult<Vec<User>> {
    store::query_by_index(conn, IDX_USERS_CREATED_AT, &KeyRange::all())
}

/// A user's health records matching `query`, newest first.
///
/// A type-only query reads the `(user_id, record_type)` index with an exact
/// key. Anything else reads the `(user_id, created_at)` index over the date
/// bounds and applies the type filter in memory.
pub fn find_health_records(conn: &Connection, user_id: &str, query: &RecordQuery) -> HlResult<Vec<HealthRecord>> {
    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        if start > end {
            return Ok(Vec::new());
        }
    }

    let mut records: Vec<HealthRecord> = match (&query.record_type, query.has_date_bounds()) {
        (Some(record_type), false) => store::query_by_index(
            conn,
            IDX_RECORDS_USER_TYPE,
            &KeyRange::only(vec![user_id.into(), record_type.as_str().into()]),
        )?,
        _ => {
            let range = KeyRange::bound(
                vec![user_id.into(), query.start_date.unwrap_or(i64::MIN).into()],
                vec![user_id.into(), query.end_date.unwrap_or(i64::MAX).into()],
            );
            let mut hits: Vec<HealthRecord> = store::query_by_index(conn, IDX_RECORDS_USER_CREATED, &range)?;
            if let Some(record_type) = &query.record_type {
                hits.retain(|r| &r.record_type == record_type);
            }
            hits
        }
    };

    records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    if let Some(limit) = query.limit {
        records.truncate(limit);
    }
    Ok(records)
}
