use std::time::Duration;

use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::utils::{connect_store, output_success};
use crate::cli::OutputFormat;
use crate::services::access::{AccessGate, DeniedReason, GateState};
use crate::store::models::AuditEntry;
use crate::types::Principal;

#[derive(Subcommand)]
pub enum AccessCommands {
    #[command(about = "Evaluate the access gate for a principal")]
    Check {
        #[arg(help = "Principal id as the auth provider knows it")]
        principal: String,
        #[arg(help = "Email the principal authenticates with")]
        email: String,
    },

    #[command(about = "Set access_control on a doctor profile")]
    Grant {
        #[arg(help = "Doctor profile id")]
        profile_id: Uuid,
    },

    #[command(about = "Clear access_control on a doctor profile")]
    Revoke {
        #[arg(help = "Doctor profile id")]
        profile_id: Uuid,
    },

    #[command(about = "Re-check the gate on an interval and print transitions")]
    Watch {
        #[arg(help = "Principal id as the auth provider knows it")]
        principal: String,
        #[arg(help = "Email the principal authenticates with")]
        email: String,
        #[arg(long, default_value_t = 30, help = "Seconds between re-checks")]
        interval_secs: u64,
    },
}

pub async fn handle(cmd: AccessCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AccessCommands::Check { principal, email } => {
            let store = connect_store().await?;
            let gate = AccessGate::new(store);
            let status = gate.check(&Principal::new(principal, email)).await;

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "data": status }))?);
                }
                OutputFormat::Text => {
                    if status.granted {
                        println!("granted ({} profile(s))", status.profiles.len());
                    } else {
                        let reason = status
                            .reason
                            .map(|r| format!("{:?}", r))
                            .unwrap_or_else(|| "unknown".to_string());
                        println!("denied: {}", reason);
                    }
                    for profile in &status.profiles {
                        println!(
                            "  {} clinic={} access={}",
                            profile.id,
                            profile
                                .clinic_id
                                .map(|c| c.to_string())
                                .unwrap_or_else(|| "-".to_string()),
                            profile.access_control
                        );
                    }
                }
            }
            Ok(())
        }

        AccessCommands::Grant { profile_id } => {
            set_access(profile_id, true, output_format).await
        }

        AccessCommands::Revoke { profile_id } => {
            set_access(profile_id, false, output_format).await
        }

        AccessCommands::Watch {
            principal,
            email,
            interval_secs,
        } => {
            let store = connect_store().await?;
            let gate = AccessGate::new(store);
            let watch = gate.watch_with_interval(
                Principal::new(principal, email),
                Duration::from_secs(interval_secs),
            );
            let mut rx = watch.subscribe();

            println!("watching (every {}s, Ctrl+C to stop)", interval_secs);
            while rx.changed().await.is_ok() {
                let state = rx.borrow().clone();
                let now = chrono::Utc::now().format("%H:%M:%S");
                match &state {
                    GateState::Unchecked => println!("{} unchecked", now),
                    GateState::Checking => println!("{} checking...", now),
                    GateState::Granted(status) => {
                        println!("{} granted ({} profile(s))", now, status.profiles.len())
                    }
                    GateState::Denied(status) => {
                        let reason = status
                            .reason
                            .map(|r| format!("{:?}", r))
                            .unwrap_or_else(|| "unknown".to_string());
                        println!("{} denied: {}", now, reason);
                        if status.reason == Some(DeniedReason::AccessRevoked) {
                            println!("access revoked; watch is sticky and has stopped");
                        }
                    }
                }
            }
            Ok(())
        }
    }
}

async fn set_access(
    profile_id: Uuid,
    granted: bool,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let store = connect_store().await?;
    let profile = store.set_access_control(profile_id, granted).await?;

    let action = if granted { "access.grant" } else { "access.revoke" };
    store
        .record_audit(AuditEntry::new(
            "cli",
            action,
            format!("profile:{}", profile.id),
            None,
        ))
        .await?;

    output_success(
        &output_format,
        &format!(
            "access_control={} for profile {} ({})",
            granted, profile.id, profile.email
        ),
        Some(json!({ "profile": profile })),
    )
}
