//! Health record commands.

use clap::Subcommand;
use console::style;
use serde_json::Value as JsonValue;

use hl_core::config::AppConfig;
use hl_core::constants::record_types;
use hl_core::error::{HlError, HlResult};
use hl_models::{HealthRecord, HealthRecordPatch, NewHealthRecord, RecordQuery};
use hl_services::HealthRecordService;
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum RecordsAction {
    /// List a user's records, newest first.
    List {
        /// User id.
        user: String,
        /// Only records of this type.
        #[arg(short = 't', long = "type")]
        record_type: Option<String>,
        /// Earliest date (YYYY-MM-DD, RFC 3339, or epoch ms), inclusive.
        #[arg(long)]
        from: Option<String>,
        /// Latest date (YYYY-MM-DD, RFC 3339, or epoch ms), inclusive.
        #[arg(long)]
        to: Option<String>,
        /// Maximum number of records.
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Add a record for a user.
    Add {
        /// User id.
        user: String,
        /// Record type (e.g. stool, symptom, meal, medication, note).
        #[arg(value_name = "TYPE")]
        record_type: String,
        /// Payload as a JSON object.
        #[arg(short, long)]
        payload: Option<String>,
    },
    /// Update a record's type or payload.
    Update {
        /// Record id.
        id: String,
        /// New record type.
        #[arg(short = 't', long = "type")]
        record_type: Option<String>,
        /// New payload as a JSON object.
        #[arg(short, long)]
        payload: Option<String>,
    },
    /// Delete a record.
    Delete {
        /// Record id.
        id: String,
    },
}

fn parse_payload(raw: &str) -> HlResult<JsonValue> {
    serde_json::from_str(raw).map_err(|e| HlError::Validation(format!("payload is not valid JSON: {e}")))
}

fn print_record(record: &HealthRecord, format: OutputFormat) -> HlResult<()> {
    match format {
        OutputFormat::Json => super::print_json(record),
        OutputFormat::Text => {
            println!(
                "  {} [{}] {} {}",
                super::format_timestamp(record.created_at),
                style(&record.record_type).cyan(),
                record.id,
                record.payload
            );
            Ok(())
        }
    }
}

pub async fn run(config: &AppConfig, action: RecordsAction, format: OutputFormat) -> HlResult<()> {
    let records = HealthRecordService::new(super::db_service(config)?);

    match action {
        RecordsAction::List { user, record_type, from, to, limit } => {
            let query = RecordQuery {
                record_type,
                start_date: from.as_deref().map(|d| super::parse_date(d, false)).transpose()?,
                end_date: to.as_deref().map(|d| super::parse_date(d, true)).transpose()?,
                limit,
            };
            let found = records.get_health_records(&user, query).await?;

            match format {
                OutputFormat::Json => super::print_json(&found)?,
                OutputFormat::Text => {
                    if found.is_empty() {
                        println!("No records for user {user}.");
                    } else {
                        let mut table = super::new_table();
                        table.set_header(vec!["Date", "Type", "ID", "Payload"]);
                        for r in &found {
                            table.add_row(vec![
                                super::format_timestamp(r.created_at),
                                r.record_type.clone(),
                                r.id.clone(),
                                super::truncate(&r.payload.to_string(), 60),
                            ]);
                        }
                        println!("{table}");
                        println!("\n{} record(s) shown", found.len());
                    }
                }
            }
        }
        RecordsAction::Add { user, record_type, payload } => {
            if !record_types::ALL.contains(&record_type.as_str()) {
                println!(
                    "  {} \"{record_type}\" is not a well-known type ({}).",
                    style("NOTE").yellow().bold(),
                    record_types::ALL.join(", ")
                );
            }
            let payload = payload.as_deref().map(parse_payload).transpose()?.unwrap_or(JsonValue::Null);
            let record = records
                .add_health_record(NewHealthRecord::new(user, record_type, payload))
                .await?;
            if let OutputFormat::Text = format {
                println!("  {} Added record:", style("OK").green().bold());
            }
            print_record(&record, format)?;
        }
        RecordsAction::Update { id, record_type, payload } => {
            let patch = HealthRecordPatch {
                record_type,
                payload: payload.as_deref().map(parse_payload).transpose()?,
                ..Default::default()
            };
            let record = records.update_health_record(&id, patch).await?;
            if let OutputFormat::Text = format {
                println!("  {} Updated record:", style("OK").green().bold());
            }
            print_record(&record, format)?;
        }
        RecordsAction::Delete { id } => {
            records.delete_health_record(&id).await?;
            match format {
                OutputFormat::Json => super::print_json(&serde_json::json!({ "deleted": id }))?,
                OutputFormat::Text => println!("  {} Deleted record {id}.", style("OK").green().bold()),
            }
        }
    }

    Ok(())
}
