//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

use serde::Deserialize;

pub mod accounts;
pub mod analytics;
pub mod backup;
pub mod balances;
pub mod categories;
pub mod settings;
pub mod sync;
pub mod transactions;

// Re-export all handlers for use in router
pub use accounts::*;
pub use analytics::*;
pub use backup::*;
pub use balances::*;
pub use categories::*;
pub use settings::*;
pub use sync::*;
pub use transactions::*;

/// Optional body naming the accounts a sync or refresh should cover
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountIdsRequest {
    pub account_ids: Option<Vec<String>>,
}
