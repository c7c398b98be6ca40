pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:3000";

#[derive(Parser)]
#[command(name = "copytrade")]
#[command(about = "Copytrade CLI - operator tools for the copy-trading portal")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, env = "COPYTRADE_SERVER", default_value = DEFAULT_SERVER, help = "Portal base URL")]
    pub server: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Grant or revoke the admin claim on a user")]
    Admin {
        #[command(subcommand)]
        cmd: commands::admin::AdminCommands,
    },

    #[command(about = "Upload a receipt or document through the portal")]
    Upload(commands::upload::UploadArgs),

    #[command(about = "Print a file as a base64 data URL for local preview")]
    Preview(commands::preview::PreviewArgs),

    #[command(about = "Mint a session token with the configured secret")]
    Token(commands::token::TokenArgs),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
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
    let server = cli.server.trim_end_matches('/').to_string();

    match cli.command {
        Commands::Admin { cmd } => commands::admin::handle(cmd, &server, output_format).await,
        Commands::Upload(args) => commands::upload::handle(args, &server, output_format).await,
        Commands::Preview(args) => commands::preview::handle(args, output_format).await,
        Commands::Token(args) => commands::token::handle(args, output_format),
    }
}
