//! fontagent - Licensed font agent
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use fontagent::cli::{Cli, Commands};
use fontagent::config::ConfigManager;
use fontagent::error::AgentResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> AgentResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let config = config_manager.load().await?;

    // Initialize logging: 0 = warn (spinners only), 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("fontagent=warn"),
        1 => EnvFilter::new("fontagent=info"),
        _ => EnvFilter::new("fontagent=debug"),
    };

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .init();
    }

    // Dispatch to command
    match cli.command {
        Commands::Sync(args) => fontagent::cli::commands::sync(args, &config).await,
        Commands::List(args) => fontagent::cli::commands::list(args, &config).await,
        Commands::Status => fontagent::cli::commands::status(&config).await,
        Commands::Clean(args) => fontagent::cli::commands::clean(args, &config).await,
        Commands::Config(args) => {
            fontagent::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
