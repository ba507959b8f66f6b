//! Entity model definitions.

pub mod user;
pub mod settings;
pub mod health_record;

use std::sync::atomic::{AtomicI64, Ordering};

static LAST_TIMESTAMP: AtomicI64 = AtomicI64::new(0);

/// Current time in epoch milliseconds, strictly increasing within the process.
///
/// Two calls in the same millisecond return consecutive values, so an update
/// always moves `updated_at` forward and records never share a `created_at`.
pub fn timestamp_now() -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    let prev = LAST_TIMESTAMP
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| Some(now.max(prev + 1)))
        .unwrap_or_else(|prev| prev);
    now.max(prev + 1)
}

/// Generate a new entity id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A required text field as given, or a validation message if it is blank.
pub(crate) fn required(field: &str, value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        Err(format!("{field} is required"))
    } else {
        Ok(value.to_string())
    }
}
