//! Shared command utilities
//!
//! - `open_store` - Open the JSON store under the server root
//! - `stripe_client` - Build the aggregator client from configuration

use std::path::Path;

use anyhow::{Context, Result};
use minister_core::{Config, JsonStore, StripeClient};

/// Open the store rooted at `root`, creating `data/` if needed
pub fn open_store(root: &Path) -> Result<JsonStore> {
    JsonStore::open(root)
        .with_context(|| format!("Failed to open data directory under {}", root.display()))
}

/// Load configuration for the server root
pub fn load_config(root: &Path, env_file: Option<&Path>) -> Result<Config> {
    Config::load(root, env_file).context("Failed to load Stripe configuration")
}

/// Stripe client for the configured environment
pub fn stripe_client(config: &Config) -> StripeClient {
    StripeClient::new(&config.secret_key).with_base_url(&config.api_base)
}
