//! Command line interface definition

use clap::{Parser, Subcommand};
use pkbridge_types::Role;
use std::path::PathBuf;

/// pkbridge - package engine transactions as job reports
#[derive(Parser)]
#[command(name = "pkbridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Replay and inspect package engine transactions as job reports")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a recorded engine script through a full job
    Replay {
        /// Script file (JSON)
        script: PathBuf,

        /// Job role the transaction runs under
        #[arg(long, value_enum, default_value = "install-packages")]
        role: Role,

        /// Local package files for install-files jobs
        #[arg(long = "file", value_name = "PATH")]
        files: Vec<PathBuf>,

        /// Keep signature checking enabled for local files
        #[arg(long)]
        only_trusted: bool,

        /// Destination directory for download-packages jobs
        #[arg(long, value_name = "DIR")]
        directory: Option<PathBuf>,

        /// Request cancellation after this many reports
        #[arg(long, value_name = "N")]
        cancel_after: Option<usize>,
    },

    /// Fetch one file with the configured external fetch command
    Fetch {
        url: String,

        /// Download directory (defaults to the configured cache directory)
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Remove stale partial and final files first
        #[arg(long)]
        force: bool,
    },

    /// Load and validate the configuration
    #[command(name = "check-config")]
    CheckConfig,
}
