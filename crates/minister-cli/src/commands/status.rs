//! Status command implementation

use std::path::Path;

use anyhow::{Context, Result};

use super::open_store;

pub fn cmd_stats(root: &Path) -> Result<()> {
    let store = open_store(root)?;
    let stats = store.stats().context("Failed to read store")?;

    println!();
    println!("📊 Minister Stats");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Data: {}", store.data_dir().display());
    println!();
    println!("   Accounts:            {}", stats.accounts);
    println!("   Transactions:        {}", stats.transactions);
    println!("   Clean transactions:  {}", stats.clean_transactions);
    println!("   Category rules:      {}", stats.category_rules);
    println!("   Default rules:       {}", stats.default_rules);
    println!("   Overrides:           {}", stats.overrides);
    println!();

    Ok(())
}
