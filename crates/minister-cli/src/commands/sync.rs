//! Sync and re-categorization commands

use std::path::Path;

use anyhow::{Context, Result};
use minister_core::{clean_all, sync_transactions, Aggregator, JsonStore, PollConfig, SyncResult};

use super::{load_config, open_store, stripe_client};

pub async fn cmd_sync(
    root: &Path,
    env_file: Option<&Path>,
    accounts: &[String],
    fetch_only: bool,
) -> Result<()> {
    let config = load_config(root, env_file)?;
    let store = open_store(root)?;
    let client = stripe_client(&config);

    println!("🔄 Syncing transactions ({})...", config.stripe_env);
    run_sync(&store, &client, accounts, &PollConfig::default(), fetch_only).await?;
    Ok(())
}

/// Fetch new transactions, re-clean unless `fetch_only`, and print a summary
pub async fn run_sync(
    store: &JsonStore,
    aggregator: &dyn Aggregator,
    accounts: &[String],
    poll: &PollConfig,
    fetch_only: bool,
) -> Result<SyncResult> {
    let result = sync_transactions(store, aggregator, Some(accounts), poll)
        .await
        .context("Sync failed")?;

    println!("   New transactions: {}", result.new_count);
    println!("   Total stored: {}", result.total_count);
    for error in &result.errors {
        println!("   ⚠️  {}", error);
    }

    if !fetch_only {
        let cleaned = {
            let _guard = store.lock();
            clean_all(store).context("Failed to categorize transactions")?
        };
        println!("   Categorized: {}", cleaned.len());
    }

    if result.errors.is_empty() {
        println!("✅ Sync complete");
    } else {
        println!("⚠️  Sync finished with {} error(s)", result.errors.len());
    }

    Ok(result)
}

/// Re-categorize every stored transaction
pub fn cmd_clean(root: &Path) -> Result<()> {
    let store = open_store(root)?;
    let cleaned = {
        let _guard = store.lock();
        clean_all(&store).context("Failed to categorize transactions")?
    };

    let uncategorized = minister_core::uncategorized(&cleaned).len();
    println!(
        "✅ Categorized {} transactions ({} uncategorized)",
        cleaned.len(),
        uncategorized
    );
    Ok(())
}
