//! User service for managing user profiles.

use tracing::{debug, info};

use hl_core::error::{HlError, HlResult};
use hl_models::models::{new_id, timestamp_now};
use hl_models::schema::Collection;
use hl_models::{queries, store, NewUser, User, UserPatch};

use crate::db_service::DbService;

/// Typed access to the users collection.
#[derive(Clone)]
pub struct UserService {
    db: DbService,
}

impl UserService {
    /// Create a new UserService.
    pub fn new(db: DbService) -> Self {
        Self { db }
    }

    /// All users, oldest first. Users created in the same millisecond are
    /// ordered by id.
    pub async fn get_users(&self) -> HlResult<Vec<User>> {
        self.db
            .run(|db| {
                let conn = db.conn()?;
                queries::list_users(&conn)
            })
            .await
    }

    /// Look up a single user.
    pub async fn get_user(&self, id: &str) -> HlResult<Option<User>> {
        let id = id.to_string();
        self.db
            .run(move |db| {
                let conn = db.conn()?;
                store::get::<User>(&conn, &id)
            })
            .await
    }

    /// Create a user with a generated id and timestamps.
    pub async fn add_user(&self, data: NewUser) -> HlResult<User> {
        let user = User::create(data, new_id(), timestamp_now())?;
        let user = self
            .db
            .run(move |db| {
                let conn = db.conn()?;
                store::put(&conn, user)
            })
            .await?;
        info!(id = %user.id, "added user");
        Ok(user)
    }

    /// Merge `patch` onto the stored user.
    ///
    /// Fails with `NotFound` if the user does not exist and with
    /// `Validation` if the patch changes `id` or `createdAt`.
    pub async fn update_user(&self, id: &str, patch: UserPatch) -> HlResult<User> {
        let id = id.to_string();
        let user = self
            .db
            .run(move |db| {
                db.transaction(|conn| {
                    let mut user = store::get::<User>(conn, &id)?
                        .ok_or_else(|| HlError::not_found(Collection::Users.name(), &id))?;
                    user.apply(patch, timestamp_now())?;
                    store::put(conn, user)
                })
            })
            .await?;
        debug!(id = %user.id, "updated user");
        Ok(user)
    }

    /// Remove a user. Removing a missing user is not an error. The user's
    /// health records are left in place.
    pub async fn delete_user(&self, id: &str) -> HlResult<()> {
        let id = id.to_string();
        let removed = self
            .db
            .run({
                let id = id.clone();
                move |db| {
                    let conn = db.conn()?;
                    store::delete::<User>(&conn, &id)
                }
            })
            .await?;
        if removed {
            info!(%id, "deleted user");
        }
        Ok(())
    }
}
