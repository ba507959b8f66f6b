//! Database management commands.

use clap::Subcommand;
use console::style;
use dialoguer::Confirm;
use rusqlite::{Connection, OpenFlags};
use tracing::warn;

use hl_core::config::AppConfig;
use hl_core::constants::{DB_NAME, DB_SCHEMA_VERSION};
use hl_core::error::{HlError, HlResult};
use hl_models::{migrations, Database, DatabaseStats};
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum DbAction {
    /// Show the database file path.
    Path,
    /// Show database statistics.
    Stats,
    /// Run an integrity check.
    Check,
    /// Show the stored and supported schema versions without upgrading.
    Version,
    /// Reset the database (WARNING: destroys all data).
    Reset {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete the database file and its side files (WARNING: destroys all data).
    Delete {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

fn confirm(prompt: &str) -> bool {
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .unwrap_or(false)
}

/// Stored version read straight from the file, without migrating it.
fn read_stored_version(db_path: &std::path::Path) -> HlResult<Option<u32>> {
    if !db_path.exists() {
        return Ok(None);
    }
    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| HlError::Connection(e.to_string()))?;
    migrations::stored_version(&conn).map_err(|e| HlError::Connection(e.to_string()))
}

/// Row counts and storage details gathered in one pass.
struct StorageInfo {
    stats: DatabaseStats,
    version: u32,
    journal_mode: String,
    page_size: i64,
    freelist_count: i64,
}

/// Blocking; call through `DbService::run`.
fn storage_info(db: &Database) -> HlResult<StorageInfo> {
    let stats = db.stats()?;
    let version = db.schema_version()?;

    let conn = db.conn()?;
    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode", [], |row| row.get(0))
        .unwrap_or_else(|_| "unknown".to_string());
    let page_size: i64 = conn
        .query_row("PRAGMA page_size", [], |row| row.get(0))
        .unwrap_or(0);
    let freelist_count: i64 = conn
        .query_row("PRAGMA freelist_count", [], |row| row.get(0))
        .unwrap_or(0);

    Ok(StorageInfo { stats, version, journal_mode, page_size, freelist_count })
}

pub async fn run(config: &AppConfig, action: DbAction, format: OutputFormat) -> HlResult<()> {
    let service = super::db_service(config)?;
    let db_path = service.path().to_path_buf();

    match action {
        DbAction::Path => match format {
            OutputFormat::Json => {
                super::print_json(&serde_json::json!({ "path": db_path.display().to_string() }))?;
            }
            OutputFormat::Text => {
                println!("{}", db_path.display());
            }
        },
        DbAction::Stats => {
            let StorageInfo { stats, version, journal_mode, page_size, freelist_count } =
                service.run(storage_info).await?;

            let [main, wal, shm] = super::database_files(&db_path);
            let size_of = |p: &std::path::Path| std::fs::metadata(p).ok().map(|m| m.len());
            let (file_size, wal_size, shm_size) = (size_of(&main), size_of(&wal), size_of(&shm));

            match format {
                OutputFormat::Json => {
                    super::print_json(&serde_json::json!({
                        "path": db_path.display().to_string(),
                        "schemaVersion": version,
                        "collections": {
                            "users": stats.users,
                            "settings": stats.settings,
                            "healthRecords": stats.health_records,
                        },
                        "fileSizeBytes": file_size,
                        "walSizeBytes": wal_size,
                        "journalMode": journal_mode,
                        "pageSize": page_size,
                        "freelistCount": freelist_count,
                    }))?;
                }
                OutputFormat::Text => {
                    println!("{}", style("Database Statistics").bold().underlined());
                    println!("  Path:          {}", db_path.display());
                    println!("  Schema:        v{version}");
                    println!("  Journal mode:  {journal_mode}");
                    println!();

                    let mut table = super::new_table();
                    table.set_header(vec!["Collection", "Count"]);
                    table.add_row(vec!["users".to_string(), stats.users.to_string()]);
                    table.add_row(vec!["settings".to_string(), stats.settings.to_string()]);
                    table.add_row(vec!["healthRecords".to_string(), stats.health_records.to_string()]);
                    println!("{table}");

                    println!();
                    println!("{}", style("Storage").bold().underlined());
                    if let Some(size) = file_size {
                        println!("  Database:      {}", super::format_bytes(size));
                    }
                    if let Some(size) = wal_size {
                        println!("  WAL file:      {}", super::format_bytes(size));
                    }
                    if let Some(size) = shm_size {
                        println!("  SHM file:      {}", super::format_bytes(size));
                    }
                    if freelist_count > 0 {
                        println!(
                            "  Reclaimable:   {} (run VACUUM to reclaim)",
                            super::format_bytes((freelist_count * page_size) as u64)
                        );
                    }
                }
            }
        }
        DbAction::Check => {
            println!("  {} Running integrity check...", style("...").dim());
            match service.run(|db| db.run_integrity_check()).await {
                Ok(()) => {
                    println!("  {} Integrity check passed.", style("OK").green().bold());
                }
                Err(e) => {
                    println!("  {} Integrity check failed: {}", style("FAIL").red().bold(), e);
                    return Err(e);
                }
            }
        }
        DbAction::Version => {
            let stored = read_stored_version(&db_path)?;
            match format {
                OutputFormat::Json => {
                    super::print_json(&serde_json::json!({
                        "name": DB_NAME,
                        "supported": DB_SCHEMA_VERSION,
                        "stored": stored,
                    }))?;
                }
                OutputFormat::Text => {
                    println!("  Database:   {DB_NAME}");
                    println!("  Supported:  v{DB_SCHEMA_VERSION}");
                    match stored {
                        Some(v) if v > DB_SCHEMA_VERSION => println!(
                            "  Stored:     v{v} {}",
                            style("(newer than this build)").red()
                        ),
                        Some(v) if v < DB_SCHEMA_VERSION => println!(
                            "  Stored:     v{v} {}",
                            style("(will be upgraded on next open)").yellow()
                        ),
                        Some(v) => println!("  Stored:     v{v}"),
                        None => println!("  Stored:     {}", style("none").dim()),
                    }
                }
            }
        }
        DbAction::Reset { yes } => {
            println!("  {} This will delete ALL local data.", style("WARNING").red().bold());
            println!("  Database: {}", db_path.display());

            if !yes && !confirm("  Are you sure you want to reset the database?") {
                println!("  Reset cancelled.");
                return Ok(());
            }

            service.run(|db| db.reset()).await?;
            println!("  {} Database reset complete.", style("OK").green().bold());
        }
        DbAction::Delete { yes } => {
            println!(
                "  {} Deleting database \"{DB_NAME}\" (schema v{DB_SCHEMA_VERSION}).",
                style("WARNING").red().bold()
            );
            println!("  Database: {}", db_path.display());

            if !yes && !confirm("  Delete the database and all of its data?") {
                println!("  Delete cancelled.");
                return Ok(());
            }

            let mut removed = 0;
            for file in super::database_files(&db_path) {
                match std::fs::remove_file(&file) {
                    Ok(()) => {
                        warn!("deleted {}", file.display());
                        removed += 1;
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }

            if removed == 0 {
                println!("  Nothing to delete.");
            } else {
                println!(
                    "  {} Deleted {removed} file(s).",
                    style("OK").green().bold()
                );
            }
        }
    }

    Ok(())
}
