//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// fontagent - Licensed font agent
///
/// Downloads licensed fonts into a hidden cache, registers them for the
/// current user and removes every trace of them on exit.
#[derive(Parser, Debug)]
#[command(name = "fontagent")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "FONTAGENT_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync the catalog and keep fonts registered until interrupted
    Sync(SyncArgs),

    /// List fonts in the catalog
    List(ListArgs),

    /// Check platform support and cache state
    Status,

    /// Remove fonts left behind by a run that did not exit cleanly
    Clean(CleanArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the sync command
#[derive(Parser, Debug)]
pub struct SyncArgs {
    /// Font directory or JSON manifest (defaults to catalog.source)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Only sync these font ids (repeatable)
    #[arg(long = "font", value_name = "ID")]
    pub fonts: Vec<String>,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Font directory or JSON manifest (defaults to catalog.source)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the clean command
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,

        /// Font directory or JSON manifest to store as catalog.source
        #[arg(short, long)]
        source: Option<PathBuf>,
    },
}

/// Output format for list command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one id per line)
    Plain,
}
