//! Financial data aggregator abstraction
//!
//! Sync, balances and account linking talk to the aggregator only through
//! the [`Aggregator`] trait.
//!
//! # Implementations
//!
//! - `StripeClient`: Stripe Financial Connections over HTTPS
//! - `MockAggregator`: in-memory accounts for tests and offline runs
//!
//! # Usage
//!
//! ```rust,ignore
//! let client = StripeClient::new(&config.secret_key).with_base_url(&config.api_base);
//! let aggregator: Arc<dyn Aggregator> = Arc::new(client);
//! let result = sync_transactions(&store, aggregator.as_ref(), None, &PollConfig::default()).await?;
//! ```

mod mock;
mod stripe;

pub use mock::MockAggregator;
pub use stripe::{StripeClient, DEFAULT_API_BASE};

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;
use crate::models::StoredTransaction;

/// Number of transactions requested per list page
pub const TRANSACTION_PAGE_SIZE: usize = 100;

/// Data an account refresh can be requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshFeature {
    Transactions,
    Balance,
}

impl RefreshFeature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transactions => "transactions",
            Self::Balance => "balance",
        }
    }
}

/// State of an in-flight or finished refresh
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RefreshState {
    pub status: String,
}

/// The subset of an aggregator account object the app reads
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AggregatorAccount {
    pub id: String,
    #[serde(default)]
    pub transaction_refresh: Option<RefreshState>,
    /// Kept opaque; stored into the balance cache as-is
    #[serde(default)]
    pub balance_refresh: Option<serde_json::Value>,
    #[serde(default)]
    pub balance: Option<serde_json::Value>,
}

impl AggregatorAccount {
    /// Status of the transaction refresh, if one is reported
    pub fn transaction_refresh_status(&self) -> Option<&str> {
        self.transaction_refresh.as_ref().map(|r| r.status.as_str())
    }

    /// Status of the balance refresh, if one is reported
    pub fn balance_refresh_status(&self) -> Option<&str> {
        self.balance_refresh
            .as_ref()
            .and_then(|r| r.get("status"))
            .and_then(|s| s.as_str())
    }
}

/// One page of an account's transactions
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransactionListPage {
    pub data: Vec<StoredTransaction>,
    #[serde(default)]
    pub has_more: bool,
}

/// Interface to the bank-data aggregator
///
/// Implementations must be Send + Sync so one client can be shared by all
/// request handlers.
#[async_trait]
pub trait Aggregator: Send + Sync {
    /// Ask the aggregator to refresh one feature of an account
    async fn refresh_account(&self, account_id: &str, feature: RefreshFeature) -> Result<()>;

    /// Fetch the account object including refresh states and balance
    async fn retrieve_account(&self, account_id: &str) -> Result<AggregatorAccount>;

    /// List one page of transactions, starting after the given transaction ID
    async fn list_transactions(
        &self,
        account_id: &str,
        starting_after: Option<&str>,
    ) -> Result<TransactionListPage>;

    /// Subscribe an account to ongoing transaction updates
    async fn subscribe_account(&self, account_id: &str) -> Result<()>;

    /// Create a customer that owns linked accounts; returns the customer ID
    async fn create_customer(&self) -> Result<String>;

    /// Create a linking session for a customer; returns its client secret
    async fn create_session(&self, customer_id: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_deserializes_refresh_states() {
        let account: AggregatorAccount = serde_json::from_value(serde_json::json!({
            "id": "fca_1",
            "object": "financial_connections.account",
            "transaction_refresh": {"id": "fctxnref_1", "status": "pending", "last_attempted_at": 1},
            "balance_refresh": null,
            "balance": null
        }))
        .unwrap();

        assert_eq!(account.transaction_refresh_status(), Some("pending"));
        assert_eq!(account.balance_refresh_status(), None);
        assert!(account.balance.is_none());
    }

    #[test]
    fn test_balance_refresh_status_reads_opaque_value() {
        let account = AggregatorAccount {
            id: "fca_1".to_string(),
            balance_refresh: Some(serde_json::json!({"status": "succeeded"})),
            ..Default::default()
        };
        assert_eq!(account.balance_refresh_status(), Some("succeeded"));
    }

    #[test]
    fn test_transaction_page_defaults_has_more() {
        let page: TransactionListPage =
            serde_json::from_str(r#"{"object":"list","data":[]}"#).unwrap();
        assert!(!page.has_more);
        assert!(page.data.is_empty());
    }
}
