pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pulse")]
#[command(about = "Pulse CLI - Operator tooling for the LeadPulse backend")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Access gate inspection and control")]
    Access {
        #[command(subcommand)]
        cmd: commands::access::AccessCommands,
    },

    #[command(about = "Short link management")]
    Links {
        #[command(subcommand)]
        cmd: commands::links::LinkCommands,
    },

    #[command(about = "Stored lead inspection")]
    Leads {
        #[command(subcommand)]
        cmd: commands::leads::LeadCommands,
    },

    #[command(about = "JWT minting for operators and test clients")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Access { cmd } => commands::access::handle(cmd, output_format).await,
        Commands::Links { cmd } => commands::links::handle(cmd, output_format).await,
        Commands::Leads { cmd } => commands::leads::handle(cmd, output_format).await,
        Commands::Token { cmd } => commands::token::handle(cmd, output_format).await,
    }
}
