//! Server command implementation

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use minister_core::PollConfig;
use minister_server::{AppState, ServerConfig};

use super::{load_config, open_store, stripe_client};

/// Directory served as the web client when `--static-dir` is not given
pub const DEFAULT_STATIC_DIR: &str = "public";

/// Explicit static dir, else `<root>/public` when it exists
pub fn resolve_static_dir(root: &Path, static_dir: Option<&Path>) -> Option<PathBuf> {
    match static_dir {
        Some(dir) => Some(dir.to_path_buf()),
        None => Some(root.join(DEFAULT_STATIC_DIR)).filter(|dir| dir.is_dir()),
    }
}

pub async fn cmd_serve(
    root: &Path,
    env_file: Option<&Path>,
    host: &str,
    port: u16,
    static_dir: Option<&Path>,
) -> Result<()> {
    let config = load_config(root, env_file)?;
    let store = open_store(root)?;
    let static_dir = resolve_static_dir(root, static_dir);

    println!("🚀 Starting Minister web server...");
    println!("   Data: {}", store.data_dir().display());
    println!("   Stripe environment: {}", config.stripe_env);
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = &static_dir {
        println!("   Static files: {}", dir.display());
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let state = AppState {
        store,
        aggregator: Arc::new(stripe_client(&config)),
        config: ServerConfig {
            publishable_key: config.publishable_key.clone(),
            poll: PollConfig::default(),
            allowed_origins: vec![],
        },
    };

    let static_dir_str = static_dir
        .as_deref()
        .map(|p| p.to_str().context("Static directory path must be valid UTF-8"))
        .transpose()?;
    minister_server::serve(state, host, port, static_dir_str).await?;

    Ok(())
}
