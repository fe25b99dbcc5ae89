use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{connect_store, output_empty_collection, output_success};
use crate::cli::OutputFormat;
use crate::services::links::LinkService;
use crate::store::models::NewLink;

#[derive(Subcommand)]
pub enum LinkCommands {
    #[command(about = "Mint a short link for a doctor")]
    Add {
        #[arg(help = "Doctor profile id the link attributes leads to")]
        doctor_id: String,
        #[arg(long, help = "Quiz type, e.g. nose (mutually exclusive with --custom-quiz-id)")]
        quiz_type: Option<String>,
        #[arg(long, help = "Custom quiz id (mutually exclusive with --quiz-type)")]
        custom_quiz_id: Option<String>,
        #[arg(long, help = "Lead source recorded on resolution, defaults to shortlink")]
        source: Option<String>,
    },

    #[command(about = "List a doctor's short links with click counts")]
    List {
        #[arg(help = "Doctor profile id")]
        doctor_id: String,
    },
}

pub async fn handle(cmd: LinkCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        LinkCommands::Add {
            doctor_id,
            quiz_type,
            custom_quiz_id,
            source,
        } => {
            let store = connect_store().await?;
            let links = LinkService::new(store);
            let link = links
                .mint(NewLink {
                    doctor_id,
                    quiz_type,
                    custom_quiz_id,
                    lead_source: source,
                })
                .await?;

            output_success(
                &output_format,
                &format!("/s/{} -> doctor {}", link.code, link.doctor_id),
                Some(json!({ "link": link })),
            )
        }

        LinkCommands::List { doctor_id } => {
            let store = connect_store().await?;
            let links = store.links_for_doctor(&doctor_id).await?;

            if links.is_empty() {
                return output_empty_collection(&output_format, "links", "No links for this doctor");
            }

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "links": links }))?);
                }
                OutputFormat::Text => {
                    println!("{:<10} {:<8} {:<12} {}", "CODE", "CLICKS", "QUIZ", "CREATED");
                    for link in links {
                        let quiz = link
                            .custom_quiz_id
                            .map(|id| format!("custom:{}", id))
                            .or(link.quiz_type)
                            .unwrap_or_else(|| "default".to_string());
                        println!(
                            "{:<10} {:<8} {:<12} {}",
                            link.code,
                            link.clicks,
                            quiz,
                            link.created_at.format("%Y-%m-%d %H:%M")
                        );
                    }
                }
            }
            Ok(())
        }
    }
}
