//! Minister Core Library
//!
//! Shared functionality for the Minister personal finance tracker:
//! - Flat JSON file storage for accounts, transactions, rules and overrides
//! - Regex category rules with manual overrides and pinned transactions
//! - Cleaning pipeline that rebuilds the categorized transaction set
//! - Spending breakdowns by category, month and week
//! - Transaction sync and balance refresh through a pluggable aggregator
//! - Backup and restore of the data directory

pub mod aggregator;
pub mod analytics;
pub mod backup;
pub mod balances;
pub mod categorize;
pub mod cleaning;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod store;
pub mod sync;

pub use aggregator::{
    Aggregator, AggregatorAccount, MockAggregator, RefreshFeature, RefreshState, StripeClient,
    TransactionListPage,
};
pub use analytics::{breakdown, category_breakdown, monthly_breakdown, weekly_breakdown};
pub use categorize::{compile_pattern, next_rule_id, CategorySource, Categorization, Categorizer};
pub use cleaning::clean_all;
pub use config::Config;
pub use error::{AggregatorErrorKind, Error, Result};
pub use models::*;
pub use query::{query_transactions, uncategorized};
pub use store::{JsonStore, Overrides};
pub use sync::{sync_transactions, PollConfig};
