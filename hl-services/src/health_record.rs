//! Health record service.
//!
//! Records are always read per user. Queries narrow through the compound
//! indices and come back newest first.

use tracing::{debug, info};

use hl_core::error::{HlError, HlResult};
use hl_models::models::{new_id, timestamp_now};
use hl_models::queries::{self, RecordQuery};
use hl_models::schema::Collection;
use hl_models::{store, HealthRecord, HealthRecordPatch, NewHealthRecord};

use crate::db_service::DbService;

/// Typed access to the health records collection.
#[derive(Clone)]
pub struct HealthRecordService {
    db: DbService,
}

impl HealthRecordService {
    /// Create a new HealthRecordService.
    pub fn new(db: DbService) -> Self {
        Self { db }
    }

    /// Records of `user_id` matching `query`, newest first.
    pub async fn get_health_records(&self, user_id: &str, query: RecordQuery) -> HlResult<Vec<HealthRecord>> {
        let user_id = user_id.to_string();
        self.db
            .run(move |db| {
                let conn = db.conn()?;
                queries::find_health_records(&conn, &user_id, &query)
            })
            .await
    }

    /// Look up a single record.
    pub async fn get_health_record(&self, id: &str) -> HlResult<Option<HealthRecord>> {
        let id = id.to_string();
        self.db
            .run(move |db| {
                let conn = db.conn()?;
                store::get::<HealthRecord>(&conn, &id)
            })
            .await
    }

    /// Store a new record with a generated id and timestamps.
    pub async fn add_health_record(&self, data: NewHealthRecord) -> HlResult<HealthRecord> {
        let record = HealthRecord::create(data, new_id(), timestamp_now())?;
        let record = self
            .db
            .run(move |db| {
                let conn = db.conn()?;
                store::put(&conn, record)
            })
            .await?;
        info!(id = %record.id, user_id = %record.user_id, record_type = %record.record_type, "added health record");
        Ok(record)
    }

    /// Merge `patch` onto the stored record.
    ///
    /// Fails with `NotFound` if the record does not exist and with
    /// `Validation` if the patch changes `id`, `userId` or `createdAt`.
    pub async fn update_health_record(&self, id: &str, patch: HealthRecordPatch) -> HlResult<HealthRecord> {
        let id = id.to_string();
        let record = self
            .db
            .run(move |db| {
                db.transaction(|conn| {
                    let mut record = store::get::<HealthRecord>(conn, &id)?
                        .ok_or_else(|| HlError::not_found(Collection::HealthRecords.name(), &id))?;
                    record.apply(patch, timestamp_now())?;
                    store::put(conn, record)
                })
            })
            .await?;
        debug!(id = %record.id, "updated health record");
        Ok(record)
    }

    /// Remove a record. Removing a missing record is not an error.
    pub async fn delete_health_record(&self, id: &str) -> HlResult<()> {
        let id = id.to_string();
        let removed = self
            .db
            .run({
                let id = id.clone();
                move |db| {
                    let conn = db.conn()?;
                    store::delete::<HealthRecord>(&conn, &id)
                }
            })
            .await?;
        if removed {
            info!(%id, "deleted health record");
        }
        Ok(())
    }
}
