//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod data;
mod remote;
mod report;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings, LoadOptions};

#[derive(Parser)]
#[command(name = "bitbets")]
#[command(about = "Class-average prediction game server")]
#[command(version)]
pub struct Cli {
    /// Data directory holding the collection files and backups
    #[arg(long, global = true, env = "BITBETS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true, env = "BITBETS_CONFIG")]
    config: Option<PathBuf>,

    /// Token required by destructive endpoints
    #[arg(long, global = true, env = "BITBETS_ADMIN_TOKEN", hide_env_values = true)]
    admin_token: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Address to bind: port, host, or host:port
        #[arg(short, long, env = "BITBETS_BIND")]
        bind: Option<String>,
    },

    /// Write a snapshot of all collections now
    Backup,

    /// Write the CSV reports now
    Export,

    /// Replace collections from a snapshot file (.json or .json.gz)
    Restore {
        /// Snapshot file to restore from
        file: PathBuf,
    },

    /// Show ranked standings for every recorded result
    Leaderboard {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show collection counts
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Talk to a running server
    Remote {
        /// Server base URL (e.g., http://localhost:5000)
        url: String,

        #[command(subcommand)]
        action: RemoteAction,
    },
}

#[derive(Subcommand, Clone, Copy)]
pub(crate) enum RemoteAction {
    /// Show the server health report
    Health,
    /// Show the server stats
    Stats,
    /// Show the server leaderboard
    Leaderboard,
    /// Ask the server to take a backup
    Backup,
    /// Ask the server to write CSV reports
    Export,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let bind = match &cli.command {
        Commands::Serve { bind } => bind.clone(),
        _ => None,
    };
    let options = LoadOptions {
        config_path: cli.config,
        data_dir: cli.data_dir,
        bind,
        admin_token: cli.admin_token,
    };
    let settings = load_settings(&options)?;

    match cli.command {
        Commands::Serve { .. } => serve::cmd_serve(&settings).await,
        Commands::Backup => data::cmd_backup(&settings).await,
        Commands::Export => data::cmd_export(&settings).await,
        Commands::Restore { file } => data::cmd_restore(&settings, &file).await,
        Commands::Leaderboard { json } => report::cmd_leaderboard(&settings, json).await,
        Commands::Stats { json } => report::cmd_stats(&settings, json).await,
        Commands::Remote { url, action } => remote::cmd_remote(&settings, &url, action).await,
    }
}
