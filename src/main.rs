//! chatpad: drives virtual game controllers from text input commands.
//!
//! Main entry point: CLI dispatch and logging setup.

mod cli;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::AppConfig;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    debug!("loading config from {}", config_path.display());
    let config = AppConfig::load(&config_path)?;

    match cli.command {
        Commands::Parse { console, text } => {
            commands::inspect::parse_text(&config, console.as_deref(), &text.join(" "))
        }
        Commands::Expand { console, text } => {
            commands::inspect::expand_text(&config, console.as_deref(), &text.join(" "))
        }
        Commands::Consoles { name } => commands::inspect::consoles(&config, name.as_deref()),
        Commands::Macros(command) => commands::macros::handle(command, &config_path, config),
        Commands::Run {
            dry_run,
            console,
            level,
        } => commands::run::run(config, console.as_deref(), dry_run, level).await,
    }
}
