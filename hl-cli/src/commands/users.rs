//! User commands.

use clap::Subcommand;
use console::style;

use hl_core::config::AppConfig;
use hl_core::error::HlResult;
use hl_models::{NewUser, User, UserPatch};
use hl_services::UserService;
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum UsersAction {
    /// List all users in creation order.
    List,
    /// Add a user.
    Add {
        /// Display name.
        name: String,
        /// Avatar image URL.
        #[arg(long)]
        avatar: Option<String>,
        /// Mark the user as active.
        #[arg(long)]
        active: bool,
    },
    /// Update a user.
    Update {
        /// User id.
        id: String,
        /// New display name.
        #[arg(long)]
        name: Option<String>,
        /// New avatar image URL (empty to clear).
        #[arg(long)]
        avatar: Option<String>,
        /// Set the active flag.
        #[arg(long)]
        active: Option<bool>,
    },
    /// Delete a user. Their health records are kept.
    Delete {
        /// User id.
        id: String,
    },
}

fn print_user(user: &User, format: OutputFormat) -> HlResult<()> {
    match format {
        OutputFormat::Json => super::print_json(user),
        OutputFormat::Text => {
            println!("  {} {} ({})", style(user.initials()).cyan().bold(), user.name, user.id);
            Ok(())
        }
    }
}

pub async fn run(config: &AppConfig, action: UsersAction, format: OutputFormat) -> HlResult<()> {
    let users = UserService::new(super::db_service(config)?);

    match action {
        UsersAction::List => {
            let all = users.get_users().await?;
            match format {
                OutputFormat::Json => super::print_json(&all)?,
                OutputFormat::Text => {
                    if all.is_empty() {
                        println!("No users. Run `healthlog users add <name>` to create one.");
                    } else {
                        let mut table = super::new_table();
                        table.set_header(vec!["ID", "Name", "Active", "Avatar", "Created"]);
                        for u in &all {
                            table.add_row(vec![
                                u.id.clone(),
                                u.name.clone(),
                                if u.is_active { "yes".to_string() } else { "-".to_string() },
                                u.avatar_url.as_deref().map_or_else(|| "-".to_string(), |a| super::truncate(a, 32)),
                                super::format_timestamp(u.created_at),
                            ]);
                        }
                        println!("{table}");
                        println!("\n{} user(s)", all.len());
                    }
                }
            }
        }
        UsersAction::Add { name, avatar, active } => {
            let user = users
                .add_user(NewUser {
                    name,
                    avatar_url: avatar,
                    is_active: Some(active),
                })
                .await?;
            if let OutputFormat::Text = format {
                println!("  {} Added user:", style("OK").green().bold());
            }
            print_user(&user, format)?;
        }
        UsersAction::Update { id, name, avatar, active } => {
            let patch = UserPatch {
                name,
                avatar_url: avatar,
                is_active: active,
                ..Default::default()
            };
            let user = users.update_user(&id, patch).await?;
            if let OutputFormat::Text = format {
                println!("  {} Updated user:", style("OK").green().bold());
            }
            print_user(&user, format)?;
        }
        UsersAction::Delete { id } => {
            users.delete_user(&id).await?;
            match format {
                OutputFormat::Json => super::print_json(&serde_json::json!({ "deleted": id }))?,
                OutputFormat::Text => println!("  {} Deleted user {id}.", style("OK").green().bold()),
            }
        }
    }

    Ok(())
}
