//! CLI command implementations.

pub mod db;
pub mod users;
pub mod records;
pub mod settings;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use hl_core::config::AppConfig;
use hl_core::error::{HlError, HlResult};
use hl_services::DbService;

/// Helper to build the database service from config.
pub fn db_service(config: &AppConfig) -> HlResult<DbService> {
    DbService::from_config(config)
}

/// The database file plus its WAL and shared-memory side files.
pub fn database_files(db_path: &Path) -> [PathBuf; 3] {
    let side = |suffix: &str| {
        let mut name = db_path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    };
    [db_path.to_path_buf(), side("-wal"), side("-shm")]
}

/// Table with the shared CLI styling.
pub fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Print a value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> HlResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format an epoch-millisecond timestamp in local time.
pub fn format_timestamp(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ms.to_string(),
    }
}

/// Parse a date argument into epoch milliseconds.
///
/// Accepts raw epoch milliseconds, RFC 3339 timestamps, or a plain
/// `YYYY-MM-DD` date. A plain date means the start of that day in local
/// time, or the last millisecond of it when `end_of_day` is set.
pub fn parse_date(input: &str, end_of_day: bool) -> HlResult<i64> {
    let input = input.trim();
    if let Ok(ms) = input.parse::<i64>() {
        return Ok(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc).timestamp_millis());
    }
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| HlError::Validation(format!("unrecognized date: {input}")))?;
    let time = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.and_then(|t| Local.from_local_datetime(&t).earliest())
        .map(|dt| dt.timestamp_millis())
        .ok_or_else(|| HlError::Validation(format!("date does not exist locally: {input}")))
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Truncate a string to a maximum number of characters, appending an
/// ellipsis if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
