//! telegram-mcp - MCP server for a Telegram user account
//!
//! Subcommands:
//! - `telegram-mcp serve` - Serve MCP over stdio (default)
//! - `telegram-mcp login` - Sign in and save the session file
//! - `telegram-mcp config` - Print the effective configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tgconf::TgConfig;

use telegram_mcp::{login, serve, telemetry};

#[derive(Parser)]
#[command(name = "telegram-mcp")]
#[command(about = "MCP server exposing a Telegram account as tools")]
#[command(version)]
struct Cli {
    /// Config file (overrides ./telegram-mcp.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over stdin/stdout
    Serve,

    /// Sign in interactively and save the session
    Login {
        /// Phone number in international format
        #[arg(short, long)]
        phone: Option<String>,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) =
        TgConfig::load_with_sources_from(cli.config.as_deref()).context("Failed to load config")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            telemetry::init(&config.telemetry)?;
            let result = serve::run(&config).await;
            if let Err(ref e) = result {
                tracing::error!("telegram-mcp failed: {:#}", e);
            }
            telemetry::shutdown();
            result?;
        }
        Commands::Login { phone } => {
            telemetry::init_stderr(&config.telemetry);
            config.validate().context("Invalid configuration")?;
            login::run(&config.telegram, phone).await?;
        }
        Commands::Config => {
            for file in &sources.files {
                println!("# loaded: {}", file.display());
            }
            for var in &sources.env_overrides {
                println!("# env override: {}", var);
            }
            if !sources.files.is_empty() || !sources.env_overrides.is_empty() {
                println!();
            }
            print!("{}", config.to_toml());
        }
    }

    Ok(())
}
