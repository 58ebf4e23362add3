//! Transaction sync from the aggregator
//!
//! For each selected account: request a transaction refresh, poll until it
//! settles, then page through the account's transactions. Unknown IDs are
//! tagged with the account and appended to the raw store, which stays sorted
//! newest first. Per-account failures are collected, never fatal.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::aggregator::{Aggregator, RefreshFeature};
use crate::error::{AggregatorErrorKind, Error, Result};
use crate::models::{LinkedAccount, StoredTransaction, SyncResult};
use crate::store::JsonStore;

/// Bounded polling for account refreshes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 30,
        }
    }
}

impl PollConfig {
    /// Same attempt budget with no sleeping between polls
    pub fn immediate() -> Self {
        Self {
            interval: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Wall-clock budget implied by the interval and attempt count
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Restrict `accounts` to the requested IDs; no IDs (or an empty list) keeps all
pub fn select_accounts(accounts: Vec<LinkedAccount>, account_ids: Option<&[String]>) -> Vec<LinkedAccount> {
    match account_ids {
        Some(ids) if !ids.is_empty() => accounts
            .into_iter()
            .filter(|a| ids.contains(&a.id))
            .collect(),
        _ => accounts,
    }
}

/// Request a transaction refresh and wait for it to settle
pub async fn refresh_account_and_wait(
    aggregator: &dyn Aggregator,
    account_id: &str,
    poll: &PollConfig,
) -> Result<()> {
    aggregator
        .refresh_account(account_id, RefreshFeature::Transactions)
        .await?;

    for attempt in 1..=poll.max_attempts {
        let account = aggregator.retrieve_account(account_id).await?;
        match account.transaction_refresh_status() {
            Some("succeeded") => return Ok(()),
            Some("failed") => {
                return Err(Error::aggregator(
                    AggregatorErrorKind::RefreshFailed,
                    "Transaction refresh failed",
                ))
            }
            status => debug!(
                "Refresh of {} still {:?} (attempt {}/{})",
                account_id, status, attempt, poll.max_attempts
            ),
        }
        if attempt < poll.max_attempts {
            tokio::time::sleep(poll.interval).await;
        }
    }

    Err(Error::aggregator(
        AggregatorErrorKind::Timeout,
        format!("Refresh timed out after {}s", poll.budget().as_secs()),
    ))
}

/// Page through every transaction of an account
pub async fn fetch_all_transactions(
    aggregator: &dyn Aggregator,
    account_id: &str,
) -> Result<Vec<StoredTransaction>> {
    let mut transactions = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = aggregator
            .list_transactions(account_id, cursor.as_deref())
            .await?;
        let has_more = page.has_more;
        cursor = page.data.last().map(|tx| tx.id.clone());
        transactions.extend(page.data);

        if !has_more || cursor.is_none() {
            break;
        }
    }

    Ok(transactions)
}

/// Pull new transactions for the linked accounts into the raw store
///
/// `account_ids` limits the sync to those accounts. The store lock is taken
/// only for the final merge, after all network calls are done.
pub async fn sync_transactions(
    store: &JsonStore,
    aggregator: &dyn Aggregator,
    account_ids: Option<&[String]>,
    poll: &PollConfig,
) -> Result<SyncResult> {
    let linked = store.read_account_data().accounts;
    if linked.is_empty() {
        return Ok(SyncResult {
            errors: vec!["No linked accounts found".to_string()],
            ..Default::default()
        });
    }

    let accounts = select_accounts(linked, account_ids);
    if accounts.is_empty() {
        return Ok(SyncResult {
            errors: vec!["No matching accounts found".to_string()],
            ..Default::default()
        });
    }

    let mut fetched: Vec<StoredTransaction> = Vec::new();
    let mut errors = Vec::new();

    for account in &accounts {
        let label = account.label();
        info!("Syncing {} ({})", label, account.id);

        if let Err(e) = refresh_account_and_wait(aggregator, &account.id, poll).await {
            warn!("[{}] Refresh failed: {}", label, e);
            errors.push(format!("[{}] Refresh failed: {}", label, e));
            continue;
        }

        match fetch_all_transactions(aggregator, &account.id).await {
            Ok(transactions) => {
                debug!("[{}] Fetched {} transactions", label, transactions.len());
                fetched.extend(transactions.into_iter().map(|mut tx| {
                    tx.account_id = account.id.clone();
                    tx.account_label = label.clone();
                    tx
                }));
            }
            Err(e) => {
                warn!("[{}] Fetch failed: {}", label, e);
                errors.push(format!("[{}] Fetch failed: {}", label, e));
            }
        }
    }

    let _guard = store.lock();
    let mut all = store.load_transactions();
    let mut known: HashSet<String> = all.iter().map(|tx| tx.id.clone()).collect();

    let before = all.len();
    for tx in fetched {
        if known.insert(tx.id.clone()) {
            all.push(tx);
        }
    }
    let new_count = all.len() - before;

    all.sort_by(|a, b| b.transacted_at.cmp(&a.transacted_at));
    store.save_transactions(&all)?;

    info!(
        "Sync complete: {} new, {} total, {} errors",
        new_count,
        all.len(),
        errors.len()
    );

    Ok(SyncResult {
        new_count,
        total_count: all.len(),
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::MockAggregator;
    use crate::models::AccountData;
    use tempfile::TempDir;

    fn tx(id: &str, transacted_at: i64) -> StoredTransaction {
        StoredTransaction {
            id: id.to_string(),
            amount: -100,
            currency: Some("usd".to_string()),
            description: Some(format!("Merchant {}", id)),
            status: "posted".to_string(),
            status_transitions: None,
            transacted_at,
            account_id: String::new(),
            account_label: String::new(),
        }
    }

    fn linked(id: &str, name: &str) -> LinkedAccount {
        LinkedAccount {
            id: id.to_string(),
            institution: Some("Chase".to_string()),
            display_name: Some(name.to_string()),
            last4: Some("1234".to_string()),
            linked_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    fn store_with_accounts(dir: &TempDir, accounts: Vec<LinkedAccount>) -> JsonStore {
        let store = JsonStore::open(dir.path()).unwrap();
        store
            .write_account_data(&AccountData {
                customer_id: Some("cus_1".to_string()),
                accounts,
            })
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_no_linked_accounts() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        let mock = MockAggregator::new();

        let result = sync_transactions(&store, &mock, None, &PollConfig::immediate())
            .await
            .unwrap();
        assert_eq!(result.new_count, 0);
        assert_eq!(result.total_count, 0);
        assert_eq!(result.errors, vec!["No linked accounts found"]);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_matching_accounts() {
        let dir = TempDir::new().unwrap();
        let store = store_with_accounts(&dir, vec![linked("fca_1", "Checking")]);
        let mock = MockAggregator::new();

        let ids = vec!["fca_other".to_string()];
        let result = sync_transactions(&store, &mock, Some(ids.as_slice()), &PollConfig::immediate())
            .await
            .unwrap();
        assert_eq!(result.errors, vec!["No matching accounts found"]);
    }

    #[tokio::test]
    async fn test_sync_tags_dedupes_and_sorts() {
        let dir = TempDir::new().unwrap();
        let store = store_with_accounts(&dir, vec![linked("fca_1", "Checking")]);
        let mut existing = tx("tx_old", 1_700_000_500);
        existing.account_id = "fca_1".to_string();
        store.save_transactions(&[existing]).unwrap();

        let mock = MockAggregator::new()
            .with_account(
                "fca_1",
                vec![
                    tx("tx_a", 1_700_000_100),
                    tx("tx_old", 1_700_000_500),
                    tx("tx_b", 1_700_000_900),
                ],
            )
            .with_refresh_statuses("fca_1", &["pending", "pending", "succeeded"])
            .with_page_size(2);

        let result = sync_transactions(&store, &mock, None, &PollConfig::immediate())
            .await
            .unwrap();

        assert_eq!(result.new_count, 2);
        assert_eq!(result.total_count, 3);
        assert!(result.errors.is_empty());

        let stored = store.load_transactions();
        let ids: Vec<&str> = stored.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["tx_b", "tx_old", "tx_a"]);
        assert_eq!(stored[0].account_id, "fca_1");
        assert_eq!(stored[0].account_label, "Chase Checking ****1234");

        let calls = mock.calls();
        assert_eq!(calls[0], "refresh fca_1 transactions");
        assert_eq!(calls.iter().filter(|c| c.starts_with("retrieve")).count(), 3);
        assert!(calls.contains(&"list fca_1 tx_old".to_string()));
    }

    #[tokio::test]
    async fn test_second_sync_adds_nothing() {
        let dir = TempDir::new().unwrap();
        let store = store_with_accounts(&dir, vec![linked("fca_1", "Checking")]);
        let mock = MockAggregator::new().with_account("fca_1", vec![tx("tx_a", 1), tx("tx_b", 2)]);

        let first = sync_transactions(&store, &mock, None, &PollConfig::immediate())
            .await
            .unwrap();
        let second = sync_transactions(&store, &mock, None, &PollConfig::immediate())
            .await
            .unwrap();

        assert_eq!(first.new_count, 2);
        assert_eq!(second.new_count, 0);
        assert_eq!(second.total_count, 2);
    }

    #[tokio::test]
    async fn test_failures_are_collected_per_account() {
        let dir = TempDir::new().unwrap();
        let store = store_with_accounts(
            &dir,
            vec![
                linked("fca_1", "Checking"),
                linked("fca_2", "Savings"),
                linked("fca_3", "Card"),
            ],
        );
        let mock = MockAggregator::new()
            .with_account("fca_1", vec![tx("tx_1", 1)])
            .with_refresh_statuses("fca_1", &["failed"])
            .with_account("fca_2", vec![])
            .with_fetch_error("fca_2", "boom")
            .with_account("fca_3", vec![tx("tx_3", 3)]);

        let result = sync_transactions(&store, &mock, None, &PollConfig::immediate())
            .await
            .unwrap();

        assert_eq!(
            result.errors,
            vec![
                "[Chase Checking ****1234] Refresh failed: Transaction refresh failed".to_string(),
                "[Chase Savings ****1234] Fetch failed: boom".to_string(),
            ]
        );
        assert_eq!(result.new_count, 1);
        assert_eq!(store.load_transactions()[0].id, "tx_3");
    }

    #[tokio::test]
    async fn test_refresh_times_out_after_max_attempts() {
        let mock = MockAggregator::new()
            .with_account("fca_1", vec![])
            .with_refresh_statuses("fca_1", &["pending"]);
        let poll = PollConfig {
            interval: Duration::ZERO,
            max_attempts: 4,
        };

        let err = refresh_account_and_wait(&mock, "fca_1", &poll)
            .await
            .unwrap_err();
        assert_eq!(err.aggregator_kind(), Some(AggregatorErrorKind::Timeout));
        assert_eq!(
            mock.calls().iter().filter(|c| c.starts_with("retrieve")).count(),
            4
        );
    }

    #[test]
    fn test_default_poll_budget_is_sixty_seconds() {
        let poll = PollConfig::default();
        assert_eq!(poll.budget(), Duration::from_secs(60));
        assert_eq!(
            format!("Refresh timed out after {}s", poll.budget().as_secs()),
            "Refresh timed out after 60s"
        );
    }

    #[test]
    fn test_select_accounts() {
        let accounts = vec![linked("fca_1", "A"), linked("fca_2", "B")];
        assert_eq!(select_accounts(accounts.clone(), None).len(), 2);
        let none: Vec<String> = Vec::new();
        assert_eq!(select_accounts(accounts.clone(), Some(none.as_slice())).len(), 2);
        let wanted = vec!["fca_2".to_string()];
        let picked = select_accounts(accounts, Some(wanted.as_slice()));
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].id, "fca_2");
    }
}
