//! Settings service for the application settings singleton.
//!
//! The settings record is created with defaults the first time it is read,
//! so callers never see a missing settings object.

use rusqlite::Connection;
use tracing::{debug, info};

use hl_core::constants::SETTINGS_ID;
use hl_core::error::HlResult;
use hl_models::models::timestamp_now;
use hl_models::{store, Settings, SettingsPatch, User};

use crate::db_service::DbService;

/// Typed access to the settings singleton.
#[derive(Clone)]
pub struct SettingsService {
    db: DbService,
}

/// Stored settings, or freshly persisted defaults.
fn load_or_create(conn: &Connection) -> HlResult<Settings> {
    match store::get::<Settings>(conn, SETTINGS_ID)? {
        Some(settings) => Ok(settings),
        None => {
            info!("creating default settings");
            store::put(conn, Settings::default_at(timestamp_now()))
        }
    }
}

impl SettingsService {
    /// Create a new SettingsService.
    pub fn new(db: DbService) -> Self {
        Self { db }
    }

    /// Current settings. A brand-new database yields the defaults.
    pub async fn get_settings(&self) -> HlResult<Settings> {
        self.db.run(|db| db.transaction(load_or_create)).await
    }

    /// Merge `patch` onto the settings and persist them.
    pub async fn update_settings(&self, patch: SettingsPatch) -> HlResult<Settings> {
        let settings = self
            .db
            .run(move |db| {
                db.transaction(|conn| {
                    let mut settings = load_or_create(conn)?;
                    settings.apply(patch, timestamp_now());
                    store::put(conn, settings)
                })
            })
            .await?;
        debug!(last_user_id = ?settings.last_user_id, "updated settings");
        Ok(settings)
    }

    /// Remember `user_id` as the selected user. The id is not checked
    /// against the users collection.
    pub async fn set_current_user(&self, user_id: &str) -> HlResult<Settings> {
        self.update_settings(SettingsPatch::select_user(user_id)).await
    }

    /// Forget the selected user.
    pub async fn clear_current_user(&self) -> HlResult<Settings> {
        self.update_settings(SettingsPatch::clear_user()).await
    }

    /// The selected user, if one is set and still exists.
    pub async fn current_user(&self) -> HlResult<Option<User>> {
        self.db
            .run(|db| {
                let conn = db.conn()?;
                let Some(settings) = store::get::<Settings>(&conn, SETTINGS_ID)? else {
                    return Ok(None);
                };
                match settings.last_user_id {
                    Some(user_id) => store::get::<User>(&conn, &user_id),
                    None => Ok(None),
                }
            })
            .await
    }
}
