//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Minister - Track and categorize your spending
#[derive(Parser)]
#[command(name = "minister")]
#[command(about = "Self-hosted personal finance tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Server root (holds data/, .env and the default rule files)
    #[arg(long, default_value = ".", global = true)]
    pub root: PathBuf,

    /// Environment file with Stripe keys (default: <root>/.env)
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Directory containing static files to serve (default: <root>/public if present)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Fetch new transactions from linked accounts and re-categorize
    Sync {
        /// Only sync these account IDs (repeatable)
        #[arg(short, long = "account")]
        accounts: Vec<String>,

        /// Skip the re-categorization pass after fetching
        #[arg(long)]
        fetch_only: bool,
    },

    /// Re-categorize every stored transaction
    Clean,

    /// Show record counts
    Stats,

    /// Manage category rules
    Rules {
        #[command(subcommand)]
        action: Option<RulesAction>,
    },

    /// Write a backup archive of the data directory
    Backup {
        /// Output file (default: minister-backup-<timestamp>.zip)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace the data directory from a backup archive
    Restore {
        /// Backup archive to restore
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// List user rules in match order
    List,

    /// Append a rule
    Add {
        /// Regex matched against transaction descriptions
        pattern: String,

        /// Category assigned on match
        category: String,

        /// Match case-sensitively
        #[arg(long)]
        case_sensitive: bool,
    },

    /// Delete a rule by ID
    Delete {
        /// Rule ID
        id: String,
    },

    /// Show which category a description would get
    Test {
        /// Transaction description
        description: String,

        /// Transaction ID (to account for overrides)
        #[arg(long)]
        transaction: Option<String>,
    },
}
