//! Minister CLI - Personal finance tracker
//!
//! Usage:
//!   minister serve --port 3000     Start web server
//!   minister sync                  Fetch and categorize new transactions
//!   minister rules add PATTERN CAT Add a category rule
//!   minister backup                Archive the data directory

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let env_file = cli.env_file.as_deref();

    match cli.command {
        Commands::Serve {
            port,
            host,
            static_dir,
        } => commands::cmd_serve(&cli.root, env_file, &host, port, static_dir.as_deref()).await,
        Commands::Sync {
            accounts,
            fetch_only,
        } => commands::cmd_sync(&cli.root, env_file, &accounts, fetch_only).await,
        Commands::Clean => commands::cmd_clean(&cli.root),
        Commands::Stats => commands::cmd_stats(&cli.root),
        Commands::Rules { action } => {
            let store = commands::open_store(&cli.root)?;
            match action {
                None | Some(RulesAction::List) => commands::cmd_rules_list(&store),
                Some(RulesAction::Add {
                    pattern,
                    category,
                    case_sensitive,
                }) => commands::cmd_rules_add(&store, &pattern, &category, case_sensitive)
                    .map(|_| ()),
                Some(RulesAction::Delete { id }) => commands::cmd_rules_delete(&store, &id),
                Some(RulesAction::Test {
                    description,
                    transaction,
                }) => commands::cmd_rules_test(&store, &description, transaction.as_deref()),
            }
        }
        Commands::Backup { output } => {
            commands::cmd_backup(&cli.root, output.as_deref()).map(|_| ())
        }
        Commands::Restore { file } => commands::cmd_restore(&cli.root, &file),
    }
}
