//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `backup` - Backup and restore of the data directory
//! - `common` - Shared utilities (open_store, load_config, stripe_client)
//! - `rules` - Category rule commands (list, add, delete, test)
//! - `serve` - Web server command
//! - `status` - Record counts
//! - `sync` - Transaction sync and re-categorization

pub mod backup;
pub mod common;
pub mod rules;
pub mod serve;
pub mod status;
pub mod sync;

// Re-export command functions for main.rs
pub use backup::*;
pub use common::*;
pub use rules::*;
pub use serve::*;
pub use status::*;
pub use sync::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
