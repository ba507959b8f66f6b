//! User profile entity model.

use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use hl_core::error::{HlError, HlResult};

use crate::schema::Collection;
use crate::store::Entity;

use super::required;

/// A person whose health records are tracked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Caller-supplied fields for a new user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub avatar_url: Option<String>,
    pub is_active: Option<bool>,
}

impl NewUser {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Partial update for a user. `id` and `created_at` may only repeat the
/// stored values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserPatch {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: Option<bool>,
    pub id: Option<String>,
    pub created_at: Option<i64>,
}

impl User {
    /// Build a new user with a generated id and both timestamps set to `now`.
    pub fn create(data: NewUser, id: String, now: i64) -> HlResult<Self> {
        let name = required("name", &data.name).map_err(HlError::Validation)?;
        Ok(Self {
            id,
            name,
            avatar_url: data.avatar_url.filter(|url| !url.trim().is_empty()),
            is_active: data.is_active.unwrap_or(false),
            created_at: now,
            updated_at: now,
        })
    }

    /// Merge a patch onto this user and stamp `updated_at`.
    ///
    /// Fails without modifying `self` if the patch changes `id` or
    /// `created_at`, or blanks the name.
    pub fn apply(&mut self, patch: UserPatch, now: i64) -> HlResult<()> {
        if patch.id.as_deref().is_some_and(|id| id != self.id) {
            return Err(HlError::Validation("user id cannot be changed".into()));
        }
        if patch.created_at.is_some_and(|at| at != self.created_at) {
            return Err(HlError::Validation("user createdAt cannot be changed".into()));
        }
        let name = match patch.name {
            Some(name) => Some(required("name", &name).map_err(HlError::Validation)?),
            None => None,
        };

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(url) = patch.avatar_url {
            self.avatar_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Initials derived from the name, e.g. "Alice Smith" -> "AS".
    pub fn initials(&self) -> String {
        let parts: Vec<&str> = self.name.split_whitespace().collect();
        let first_char = |s: &str| s.chars().next().map(|c| c.to_uppercase().to_string()).unwrap_or_default();
        match parts.as_slice() {
            [] => "?".to_string(),
            [only] => first_char(*only),
            [first, .., last] => format!("{}{}", first_char(*first), first_char(*last)),
        }
    }
}

impl Entity for User {
    const COLLECTION: Collection = Collection::Users;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            avatar_url: row.get("avatar_url")?,
            is_active: row.get("is_active")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn to_columns(&self) -> HlResult<Vec<(&'static str, Value)>> {
        Ok(vec![
            ("id", Value::Text(self.id.clone())),
            ("name", Value::Text(self.name.clone())),
            ("avatar_url", self.avatar_url.clone().map_or(Value::Null, Value::Text)),
            ("is_active", Value::Integer(self.is_active as i64)),
            ("created_at", Value::Integer(self.created_at)),
            ("updated_at", Value::Integer(self.updated_at)),
        ])
    }
}
