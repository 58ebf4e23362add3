//! In-memory aggregator for tests and offline development
//!
//! Accounts are configured up front with their transactions, the sequence of
//! refresh statuses to report, and optional failures. Every call is recorded
//! so tests can assert on what was requested.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{AggregatorErrorKind, Error, Result};
use crate::models::StoredTransaction;

use super::{
    Aggregator, AggregatorAccount, RefreshFeature, RefreshState, TransactionListPage,
    TRANSACTION_PAGE_SIZE,
};

#[derive(Default)]
struct MockAccount {
    transactions: Vec<StoredTransaction>,
    /// Statuses reported by successive retrieves; the last one repeats
    refresh_statuses: VecDeque<String>,
    balance: Option<serde_json::Value>,
    refresh_error: Option<String>,
    fetch_error: Option<String>,
}

#[derive(Default)]
struct MockState {
    accounts: HashMap<String, MockAccount>,
    calls: Vec<String>,
    customers_created: usize,
    sessions_created: usize,
    invalid_key: bool,
}

/// Mock aggregator backend
#[derive(Default)]
pub struct MockAggregator {
    state: Mutex<MockState>,
    page_size: Option<usize>,
}

impl MockAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn account_mut(&mut self, account_id: &str) -> &mut MockAccount {
        self.state
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .accounts
            .entry(account_id.to_string())
            .or_default()
    }

    /// Add an account serving the given transactions
    pub fn with_account(mut self, account_id: &str, transactions: Vec<StoredTransaction>) -> Self {
        self.account_mut(account_id).transactions = transactions;
        self
    }

    /// Statuses reported by successive retrieves (default: "succeeded")
    pub fn with_refresh_statuses(mut self, account_id: &str, statuses: &[&str]) -> Self {
        self.account_mut(account_id).refresh_statuses =
            statuses.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_balance(mut self, account_id: &str, balance: serde_json::Value) -> Self {
        self.account_mut(account_id).balance = Some(balance);
        self
    }

    /// Make refresh requests for this account fail
    pub fn with_refresh_error(mut self, account_id: &str, message: &str) -> Self {
        self.account_mut(account_id).refresh_error = Some(message.to_string());
        self
    }

    /// Make transaction listing for this account fail
    pub fn with_fetch_error(mut self, account_id: &str, message: &str) -> Self {
        self.account_mut(account_id).fetch_error = Some(message.to_string());
        self
    }

    /// Reject customer and session creation as if the API key were bad
    pub fn with_invalid_key(mut self) -> Self {
        self.state
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .invalid_key = true;
        self
    }

    /// Page size for transaction listing (default 100)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    /// Calls made so far, e.g. `"refresh fca_1 transactions"`
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn customers_created(&self) -> usize {
        self.state().customers_created
    }

    pub fn sessions_created(&self) -> usize {
        self.state().sessions_created
    }
}

fn no_such_account(account_id: &str) -> Error {
    Error::aggregator(
        AggregatorErrorKind::InvalidRequest,
        format!("No such account: '{}'", account_id),
    )
}

#[async_trait]
impl Aggregator for MockAggregator {
    async fn refresh_account(&self, account_id: &str, feature: RefreshFeature) -> Result<()> {
        let mut state = self.state();
        state
            .calls
            .push(format!("refresh {} {}", account_id, feature.as_str()));
        let account = state
            .accounts
            .get(account_id)
            .ok_or_else(|| no_such_account(account_id))?;
        match &account.refresh_error {
            Some(message) => Err(Error::aggregator(AggregatorErrorKind::Api, message.clone())),
            None => Ok(()),
        }
    }

    async fn retrieve_account(&self, account_id: &str) -> Result<AggregatorAccount> {
        let mut state = self.state();
        state.calls.push(format!("retrieve {}", account_id));
        let account = state
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| no_such_account(account_id))?;

        let status = if account.refresh_statuses.len() > 1 {
            account.refresh_statuses.pop_front()
        } else {
            account.refresh_statuses.front().cloned()
        }
        .unwrap_or_else(|| "succeeded".to_string());

        Ok(AggregatorAccount {
            id: account_id.to_string(),
            transaction_refresh: Some(RefreshState {
                status: status.clone(),
            }),
            balance_refresh: account
                .balance
                .as_ref()
                .map(|_| serde_json::json!({ "status": status })),
            balance: account.balance.clone(),
        })
    }

    async fn list_transactions(
        &self,
        account_id: &str,
        starting_after: Option<&str>,
    ) -> Result<TransactionListPage> {
        let page_size = self.page_size.unwrap_or(TRANSACTION_PAGE_SIZE);
        let mut state = self.state();
        state.calls.push(format!(
            "list {} {}",
            account_id,
            starting_after.unwrap_or("-")
        ));
        let account = state
            .accounts
            .get(account_id)
            .ok_or_else(|| no_such_account(account_id))?;
        if let Some(message) = &account.fetch_error {
            return Err(Error::aggregator(AggregatorErrorKind::Api, message.clone()));
        }

        let start = starting_after
            .and_then(|cursor| account.transactions.iter().position(|tx| tx.id == cursor))
            .map_or(0, |i| i + 1);
        let end = (start + page_size).min(account.transactions.len());

        Ok(TransactionListPage {
            data: account.transactions[start..end].to_vec(),
            has_more: end < account.transactions.len(),
        })
    }

    async fn subscribe_account(&self, account_id: &str) -> Result<()> {
        let mut state = self.state();
        state.calls.push(format!("subscribe {}", account_id));
        if state.accounts.contains_key(account_id) {
            Ok(())
        } else {
            Err(no_such_account(account_id))
        }
    }

    async fn create_customer(&self) -> Result<String> {
        let mut state = self.state();
        if state.invalid_key {
            return Err(Error::aggregator(
                AggregatorErrorKind::Authentication,
                "Invalid API Key provided",
            ));
        }
        state.customers_created += 1;
        Ok(format!("cus_mock_{}", state.customers_created))
    }

    async fn create_session(&self, customer_id: &str) -> Result<String> {
        let mut state = self.state();
        if state.invalid_key {
            return Err(Error::aggregator(
                AggregatorErrorKind::Authentication,
                "Invalid API Key provided",
            ));
        }
        state.calls.push(format!("session {}", customer_id));
        state.sessions_created += 1;
        Ok(format!("fcsess_mock_{}_secret", state.sessions_created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(id: &str) -> StoredTransaction {
        StoredTransaction {
            id: id.to_string(),
            amount: -100,
            currency: None,
            description: Some(id.to_string()),
            status: "posted".to_string(),
            status_transitions: None,
            transacted_at: 1_700_000_000,
            account_id: String::new(),
            account_label: String::new(),
        }
    }

    #[tokio::test]
    async fn test_refresh_statuses_advance_then_repeat() {
        let mock = MockAggregator::new()
            .with_account("fca_1", vec![])
            .with_refresh_statuses("fca_1", &["pending", "succeeded"]);

        let first = mock.retrieve_account("fca_1").await.unwrap();
        let second = mock.retrieve_account("fca_1").await.unwrap();
        let third = mock.retrieve_account("fca_1").await.unwrap();

        assert_eq!(first.transaction_refresh_status(), Some("pending"));
        assert_eq!(second.transaction_refresh_status(), Some("succeeded"));
        assert_eq!(third.transaction_refresh_status(), Some("succeeded"));
    }

    #[tokio::test]
    async fn test_list_transactions_pages_with_cursor() {
        let mock = MockAggregator::new()
            .with_account("fca_1", vec![tx("a"), tx("b"), tx("c")])
            .with_page_size(2);

        let first = mock.list_transactions("fca_1", None).await.unwrap();
        assert_eq!(first.data.len(), 2);
        assert!(first.has_more);

        let second = mock.list_transactions("fca_1", Some("b")).await.unwrap();
        assert_eq!(second.data.len(), 1);
        assert_eq!(second.data[0].id, "c");
        assert!(!second.has_more);
    }

    #[tokio::test]
    async fn test_unknown_account_is_invalid_request() {
        let mock = MockAggregator::new();
        let err = mock.retrieve_account("fca_missing").await.unwrap_err();
        assert_eq!(err.aggregator_kind(), Some(AggregatorErrorKind::InvalidRequest));
    }

    #[tokio::test]
    async fn test_invalid_key_rejects_customer_creation() {
        let mock = MockAggregator::new().with_invalid_key();
        let err = mock.create_customer().await.unwrap_err();
        assert_eq!(err.aggregator_kind(), Some(AggregatorErrorKind::Authentication));
        assert_eq!(mock.customers_created(), 0);
    }
}
