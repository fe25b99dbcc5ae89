use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{connect_store, output_empty_collection};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum LeadCommands {
    #[command(about = "List stored leads for a doctor, newest first")]
    List {
        #[arg(help = "Doctor profile id")]
        doctor_id: String,
        #[arg(long, help = "Show at most this many leads")]
        limit: Option<usize>,
    },
}

pub async fn handle(cmd: LeadCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        LeadCommands::List { doctor_id, limit } => {
            let store = connect_store().await?;
            let mut leads = store.leads_for_doctor(&doctor_id).await?;
            if let Some(limit) = limit {
                leads.truncate(limit);
            }

            if leads.is_empty() {
                return output_empty_collection(&output_format, "leads", "No leads for this doctor");
            }

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "leads": leads }))?);
                }
                OutputFormat::Text => {
                    println!(
                        "{:<22} {:<26} {:<10} {:<7} {}",
                        "NAME", "EMAIL", "QUIZ", "SCORE", "SUBMITTED"
                    );
                    for lead in leads {
                        println!(
                            "{:<22} {:<26} {:<10} {:<7} {}",
                            lead.name,
                            lead.email,
                            lead.quiz_type,
                            lead.score,
                            lead.submitted_at.format("%Y-%m-%d %H:%M")
                        );
                    }
                }
            }
            Ok(())
        }
    }
}
