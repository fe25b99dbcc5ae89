use clap::Subcommand;
use serde_json::json;

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Mint a bearer token for a principal")]
    Mint {
        #[arg(help = "Principal id as the auth provider knows it")]
        principal: String,
        #[arg(help = "Email the principal authenticates with")]
        email: String,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Mint { principal, email } => {
            let claims = Claims::new(principal, email);
            let expires_at = claims.exp;
            let token = generate_jwt(claims)?;

            match output_format {
                OutputFormat::Text => {
                    println!("{}", token);
                    Ok(())
                }
                OutputFormat::Json => output_success(
                    &output_format,
                    "token minted",
                    Some(json!({ "token": token, "expires_at": expires_at })),
                ),
            }
        }
    }
}
