//! HealthLog CLI - Command-line access to the on-device HealthLog database.
//!
//! Inspects and maintains the database (stats, integrity, schema version,
//! reset, delete) and reads or edits users, settings and health records
//! through the same accessors the application uses.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use hl_core::config::AppConfig;
use hl_core::error::HlResult;
use hl_core::logging;

/// HealthLog - personal health tracking.
#[derive(Parser)]
#[command(
    name = "healthlog",
    version,
    about = "HealthLog database CLI",
    long_about = "A command-line interface for the HealthLog on-device database.\n\
                  Inspect, migrate, reset or delete the database, and manage users,\n\
                  settings and health records from the terminal."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Database management commands.
    Db {
        #[command(subcommand)]
        action: commands::db::DbAction,
    },
    /// List and manage users.
    Users {
        #[command(subcommand)]
        action: commands::users::UsersAction,
    },
    /// List and manage health records.
    Records {
        #[command(subcommand)]
        action: commands::records::RecordsAction,
    },
    /// View and modify application settings.
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
}

#[tokio::main]
async fn main() -> HlResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match cli.config.as_deref() {
        Some(path) => AppConfig::load_from_file(std::path::Path::new(path))?,
        None => AppConfig::load_default()?,
    };

    // Initialize logging
    let level_override = cli.verbose.then_some("debug");
    let log_dir = config
        .effective_log_dir()
        .unwrap_or_else(|_| PathBuf::from("logs"));
    let _guard = match logging::init_from_config(&config.logging, &log_dir, level_override) {
        Ok(guard) => Some(guard),
        Err(e) => {
            logging::init_console_logging(level_override.unwrap_or(&config.logging.level));
            tracing::warn!("file logging unavailable, logging to console only: {e}");
            None
        }
    };

    info!("HealthLog CLI v{}", hl_core::constants::APP_VERSION);

    // Dispatch to command handlers
    match cli.command {
        Commands::Db { action } => commands::db::run(&config, action, cli.format).await,
        Commands::Users { action } => commands::users::run(&config, action, cli.format).await,
        Commands::Records { action } => commands::records::run(&config, action, cli.format).await,
        Commands::Settings { action } => commands::settings::run(&config, action, cli.format).await,
    }
}
