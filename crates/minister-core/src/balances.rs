//! Account balances: cached view and refresh

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::aggregator::{Aggregator, AggregatorAccount, RefreshFeature};
use crate::error::Result;
use crate::models::{AccountBalance, BalanceEntry, LinkedAccount};
use crate::store::JsonStore;
use crate::sync::{select_accounts, PollConfig};

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// One row per linked account, merged with its cached balance entry
pub fn list_balances(store: &JsonStore) -> Vec<AccountBalance> {
    let balances = store.load_balances();
    store
        .read_account_data()
        .accounts
        .iter()
        .map(|account| {
            let entry = balances.get(&account.id).cloned().unwrap_or_default();
            AccountBalance::new(account, entry)
        })
        .collect()
}

/// Request a balance refresh and poll until it settles or the budget runs out
///
/// Sleeps before every retrieve. Returns the last retrieved account, or
/// `None` when the poll budget is zero.
async fn refresh_balance(
    aggregator: &dyn Aggregator,
    account_id: &str,
    poll: &PollConfig,
) -> Result<Option<AggregatorAccount>> {
    aggregator
        .refresh_account(account_id, RefreshFeature::Balance)
        .await?;

    let mut latest = None;
    for _ in 0..poll.max_attempts {
        tokio::time::sleep(poll.interval).await;
        let account = aggregator.retrieve_account(account_id).await?;
        let settled = account.balance_refresh.is_none()
            || matches!(account.balance_refresh_status(), Some("succeeded" | "failed"));
        latest = Some(account);
        if settled {
            break;
        }
    }
    Ok(latest)
}

/// Refresh balances for the selected accounts and update the cache
///
/// Per-account failures are stored as `{error, last_refreshed}` entries.
/// Returns an empty list when there is nothing to refresh.
pub async fn refresh_balances(
    store: &JsonStore,
    aggregator: &dyn Aggregator,
    account_ids: Option<&[String]>,
    poll: &PollConfig,
) -> Result<Vec<AccountBalance>> {
    let accounts: Vec<LinkedAccount> =
        select_accounts(store.read_account_data().accounts, account_ids);
    if accounts.is_empty() {
        return Ok(Vec::new());
    }

    let mut results = Vec::with_capacity(accounts.len());
    for account in &accounts {
        let entry = match refresh_balance(aggregator, &account.id, poll).await {
            Ok(Some(retrieved)) => {
                debug!("Balance for {} refreshed", account.id);
                BalanceEntry {
                    balance: retrieved.balance,
                    balance_refresh: retrieved.balance_refresh,
                    last_refreshed: Some(now_iso()),
                    error: None,
                }
            }
            Ok(None) => continue,
            Err(e) => {
                warn!("Balance refresh failed for {}: {}", account.id, e);
                BalanceEntry {
                    error: Some(e.to_string()),
                    last_refreshed: Some(now_iso()),
                    ..Default::default()
                }
            }
        };
        results.push(AccountBalance::new(account, entry));
    }

    let _guard = store.lock();
    let mut balances = store.load_balances();
    for row in &results {
        balances.insert(row.account_id.clone(), row.entry.clone());
    }
    store.save_balances(&balances)?;

    info!("Refreshed balances for {} accounts", results.len());
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::MockAggregator;
    use crate::models::AccountData;
    use tempfile::TempDir;

    fn linked(id: &str) -> LinkedAccount {
        LinkedAccount {
            id: id.to_string(),
            institution: Some("Chase".to_string()),
            display_name: Some("Checking".to_string()),
            last4: Some("1234".to_string()),
            linked_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    fn store_with(dir: &TempDir, ids: &[&str]) -> JsonStore {
        let store = JsonStore::open(dir.path()).unwrap();
        store
            .write_account_data(&AccountData {
                customer_id: None,
                accounts: ids.iter().map(|id| linked(id)).collect(),
            })
            .unwrap();
        store
    }

    #[test]
    fn test_list_balances_merges_cache() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, &["fca_1", "fca_2"]);
        let mut cache = crate::store::Balances::new();
        cache.insert(
            "fca_1".to_string(),
            BalanceEntry {
                balance: Some(serde_json::json!({"current": {"usd": 1000}})),
                last_refreshed: Some("2024-03-01T00:00:00.000Z".to_string()),
                ..Default::default()
            },
        );
        store.save_balances(&cache).unwrap();

        let rows = list_balances(&store);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].entry.balance.as_ref().unwrap()["current"]["usd"], 1000);
        assert_eq!(rows[1].entry, BalanceEntry::default());

        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["account_id"], "fca_1");
        assert_eq!(json["institution"], "Chase");
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_refresh_stores_balance_and_errors() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, &["fca_1", "fca_2"]);
        let mock = MockAggregator::new()
            .with_account("fca_1", vec![])
            .with_balance("fca_1", serde_json::json!({"current": {"usd": 5000}}))
            .with_refresh_statuses("fca_1", &["pending", "succeeded"])
            .with_account("fca_2", vec![])
            .with_refresh_error("fca_2", "account inactive");

        let rows = refresh_balances(&store, &mock, None, &PollConfig::immediate())
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].entry.balance_refresh.as_ref().unwrap()["status"], "succeeded");
        assert!(rows[0].entry.last_refreshed.is_some());
        assert_eq!(rows[1].entry.error.as_deref(), Some("account inactive"));
        assert!(rows[1].entry.balance.is_none());

        let cached = store.load_balances();
        assert_eq!(cached.len(), 2);
        assert_eq!(cached["fca_1"].balance.as_ref().unwrap()["current"]["usd"], 5000);
        assert_eq!(
            mock.calls().iter().filter(|c| c.as_str() == "retrieve fca_1").count(),
            2
        );
    }

    #[tokio::test]
    async fn test_refresh_with_no_accounts_returns_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        let rows = refresh_balances(&store, &MockAggregator::new(), None, &PollConfig::immediate())
            .await
            .unwrap();
        assert!(rows.is_empty());
        assert!(store.load_balances().is_empty());
    }
}
