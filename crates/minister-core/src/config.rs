//! Runtime configuration
//!
//! Values come from the process environment first, then from a `.env` file
//! (`KEY=VALUE` lines, `#` comments). Keys:
//!
//! - `stripe_env`: Stripe environment name (default: sandbox)
//! - `stripe_{env}_secret_key`: secret API key (required)
//! - `stripe_{env}_publishable_key`: publishable key for the linking UI (required)
//! - `MINISTER_STRIPE_API_BASE`: API host override (default: https://api.stripe.com)

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::aggregator::DEFAULT_API_BASE;
use crate::error::{Error, Result};

pub const ENV_FILE: &str = ".env";
pub const DEFAULT_STRIPE_ENV: &str = "sandbox";
pub const API_BASE_VAR: &str = "MINISTER_STRIPE_API_BASE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub stripe_env: String,
    pub secret_key: String,
    pub publishable_key: String,
    pub api_base: String,
}

/// Parse `KEY=VALUE` lines; blank lines, comments and lines without `=` are skipped
pub fn parse_env_file(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

impl Config {
    /// Load from the environment and `env_file` (default `<root>/.env`)
    pub fn load(root: &Path, env_file: Option<&Path>) -> Result<Self> {
        let path = env_file
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.join(ENV_FILE));

        let file_vars = match fs::read_to_string(&path) {
            Ok(contents) => {
                debug!("Loaded {}", path.display());
                parse_env_file(&contents)
            }
            Err(_) => HashMap::new(),
        };

        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| file_vars.get(key).cloned()))
    }

    /// Build from a key lookup function
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let stripe_env = get("stripe_env").unwrap_or_else(|| DEFAULT_STRIPE_ENV.to_string());
        let secret_name = format!("stripe_{}_secret_key", stripe_env);
        let publishable_name = format!("stripe_{}_publishable_key", stripe_env);

        let (Some(secret_key), Some(publishable_key)) = (get(&secret_name), get(&publishable_name))
        else {
            return Err(Error::Config(format!(
                "Missing {} or {} in environment",
                secret_name, publishable_name
            )));
        };

        let api_base = get(API_BASE_VAR).unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Ok(Self {
            stripe_env,
            secret_key,
            publishable_key,
            api_base,
        })
    }
}
