//! Settings commands.

use clap::Subcommand;
use console::style;

use hl_core::config::AppConfig;
use hl_core::error::HlResult;
use hl_services::{SettingsService, UserService};
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Show the application settings.
    Show,
    /// Select the current user.
    UseUser {
        /// User id.
        id: String,
    },
    /// Clear the current user selection.
    ClearUser,
}

pub async fn run(config: &AppConfig, action: SettingsAction, format: OutputFormat) -> HlResult<()> {
    let db = super::db_service(config)?;
    let settings = SettingsService::new(db.clone());

    match action {
        SettingsAction::Show => {
            let current = settings.get_settings().await?;
            let user = settings.current_user().await?;
            match format {
                OutputFormat::Json => super::print_json(&serde_json::json!({
                    "settings": current,
                    "currentUser": user,
                }))?,
                OutputFormat::Text => {
                    println!("{}", style("Settings").bold().underlined());
                    let selected = match (&current.last_user_id, &user) {
                        (None, _) => style("none").dim().to_string(),
                        (Some(_), Some(u)) => format!("{} ({})", u.name, u.id),
                        (Some(id), None) => format!("{id} {}", style("(missing)").yellow()),
                    };
                    println!("  Current user:  {selected}");
                    println!("  Updated:       {}", super::format_timestamp(current.updated_at));
                }
            }
        }
        SettingsAction::UseUser { id } => {
            if UserService::new(db).get_user(&id).await?.is_none() {
                println!(
                    "  {} No user with id {id}; selecting it anyway.",
                    style("WARN").yellow().bold()
                );
            }
            let updated = settings.set_current_user(&id).await?;
            match format {
                OutputFormat::Json => super::print_json(&updated)?,
                OutputFormat::Text => {
                    println!("  {} Current user set to {id}.", style("OK").green().bold());
                }
            }
        }
        SettingsAction::ClearUser => {
            let updated = settings.clear_current_user().await?;
            match format {
                OutputFormat::Json => super::print_json(&updated)?,
                OutputFormat::Text => println!("  {} Current user cleared.", style("OK").green().bold()),
            }
        }
    }

    Ok(())
}
