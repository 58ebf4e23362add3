//! Domain models for Minister

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Category assigned when no override or rule applies
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Category excluded from spending analytics
pub const TRANSFER: &str = "Transfer";

/// A bank account linked through the aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last4: Option<String>,
    pub linked_at: String,
}

impl LinkedAccount {
    /// Human-readable label, e.g. "Chase Sapphire ****1234"
    pub fn label(&self) -> String {
        let last4 = self.last4.as_ref().map(|l| format!("****{}", l));
        [self.institution.as_ref(), self.display_name.as_ref(), last4.as_ref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Contents of `linked_account.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub accounts: Vec<LinkedAccount>,
}

/// Raw status transition timestamps (unix seconds)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusTransitions {
    #[serde(default)]
    pub posted_at: Option<i64>,
    #[serde(default)]
    pub void_at: Option<i64>,
}

/// A transaction as fetched from the aggregator
///
/// Only the fields listed here survive deserialization; aggregator
/// bookkeeping fields (`object`, `livemode`, `transaction_refresh`, ...)
/// are dropped on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub id: String,
    /// Signed amount in cents (negative = money out)
    pub amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_transitions: Option<StatusTransitions>,
    /// Unix timestamp (seconds)
    pub transacted_at: i64,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub account_label: String,
}

/// Status transitions with timestamps rendered as ISO dates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanStatusTransitions {
    #[serde(default)]
    pub posted_at: Option<String>,
    #[serde(default)]
    pub void_at: Option<String>,
}

/// A normalized, categorized transaction
///
/// Derived in bulk from [`StoredTransaction`]s by the cleaning pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanTransaction {
    pub id: String,
    pub amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_transitions: Option<CleanStatusTransitions>,
    pub category: String,
    /// YYYY-MM-DD (UTC)
    pub date: String,
    pub year: i32,
    pub month: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_label: Option<String>,
}

/// A regex pattern mapped to a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub id: String,
    pub category: String,
    pub pattern: String,
    #[serde(rename = "caseSensitive", default)]
    pub case_sensitive: bool,
}

/// Outcome of a transaction sync
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub new_count: usize,
    pub total_count: usize,
    pub errors: Vec<String>,
}

/// Optional filters applied on top of the expenses-only base filter
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsFilters {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub account: Option<String>,
    pub category: Option<String>,
}

/// Breakdown grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Category,
    Month,
    Week,
}

impl GroupBy {
    /// JSON field name carrying the group key
    pub fn key_name(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Month => "month",
            Self::Week => "week_start",
        }
    }
}

impl std::str::FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "category" | "categories" => Ok(Self::Category),
            "month" | "monthly" => Ok(Self::Month),
            "week" | "weekly" => Ok(Self::Week),
            _ => Err(format!("Unknown grouping: {}", s)),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Category => "category",
            Self::Month => "month",
            Self::Week => "week",
        };
        write!(f, "{}", name)
    }
}

/// One aggregated row of a breakdown
///
/// Serializes as `{<key_name>: key, count, total_cents, total}`.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownRow {
    pub group_by: GroupBy,
    pub key: String,
    pub count: usize,
    pub total_cents: i64,
    /// "$" + absolute dollars, two decimals
    pub total: String,
}

impl Serialize for BreakdownRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry(self.group_by.key_name(), &self.key)?;
        map.serialize_entry("count", &self.count)?;
        map.serialize_entry("total_cents", &self.total_cents)?;
        map.serialize_entry("total", &self.total)?;
        map.end()
    }
}

/// Sort order for transaction listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    DateAsc,
    #[default]
    DateDesc,
    AmountAsc,
    AmountDesc,
}

impl SortOrder {
    /// Parse a sort key; anything unrecognized sorts newest first
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("date_asc") => Self::DateAsc,
            Some("amount_asc") => Self::AmountAsc,
            Some("amount_desc") => Self::AmountDesc,
            _ => Self::DateDesc,
        }
    }
}

/// Query parameters for listing clean transactions
///
/// `page` and `limit` are kept as strings so malformed values fall back to
/// defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    pub account: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// One page of transactions
#[derive(Debug, Clone, Serialize)]
pub struct TransactionPage {
    pub data: Vec<CleanTransaction>,
    pub pagination: Pagination,
}

/// Cached balance state for one account
///
/// Balance payloads are kept as the aggregator returned them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_refresh: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_refreshed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Balance row returned to clients: account identity plus cached entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountBalance {
    pub account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last4: Option<String>,
    #[serde(flatten)]
    pub entry: BalanceEntry,
}

impl AccountBalance {
    pub fn new(account: &LinkedAccount, entry: BalanceEntry) -> Self {
        Self {
            account_id: account.id.clone(),
            institution: account.institution.clone(),
            display_name: account.display_name.clone(),
            last4: account.last4.clone(),
            entry,
        }
    }
}

/// Record counts across the store
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub transactions: usize,
    pub clean_transactions: usize,
    pub category_rules: usize,
    pub default_rules: usize,
    pub overrides: usize,
    pub accounts: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(institution: Option<&str>, name: Option<&str>, last4: Option<&str>) -> LinkedAccount {
        LinkedAccount {
            id: "fca_1".to_string(),
            institution: institution.map(String::from),
            display_name: name.map(String::from),
            last4: last4.map(String::from),
            linked_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_account_label_joins_present_parts() {
        let acct = account(Some("Chase"), Some("Sapphire"), Some("1234"));
        assert_eq!(acct.label(), "Chase Sapphire ****1234");
    }

    #[test]
    fn test_account_label_skips_missing_and_empty_parts() {
        let acct = account(Some(""), Some("Checking"), None);
        assert_eq!(acct.label(), "Checking");
        assert_eq!(account(None, None, None).label(), "");
    }

    #[test]
    fn test_stored_transaction_drops_aggregator_fields() {
        let raw = serde_json::json!({
            "id": "fctxn_1",
            "object": "financial_connections.transaction",
            "account": "fca_1",
            "amount": -450,
            "currency": "usd",
            "description": "Blue Bottle Coffee",
            "livemode": false,
            "status": "posted",
            "status_transitions": {"posted_at": 1700000000, "void_at": null},
            "transacted_at": 1700000000,
            "transaction_refresh": "fctxnref_1",
            "updated": 1700000001
        });

        let tx: StoredTransaction = serde_json::from_value(raw).unwrap();
        let back = serde_json::to_value(&tx).unwrap();

        assert!(back.get("object").is_none());
        assert!(back.get("livemode").is_none());
        assert!(back.get("transaction_refresh").is_none());
        assert_eq!(back["amount"], -450);
        assert_eq!(tx.status_transitions.unwrap().posted_at, Some(1700000000));
    }

    #[test]
    fn test_category_rule_uses_camel_case_flag() {
        let rule: CategoryRule = serde_json::from_str(
            r#"{"id":"1","category":"Dining","pattern":"Coffee","caseSensitive":true}"#,
        )
        .unwrap();
        assert!(rule.case_sensitive);

        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["caseSensitive"], true);
    }

    #[test]
    fn test_breakdown_row_key_name_follows_grouping() {
        let row = BreakdownRow {
            group_by: GroupBy::Week,
            key: "2024-03-03".to_string(),
            count: 2,
            total_cents: -1200,
            total: "$12.00".to_string(),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["week_start"], "2024-03-03");
        assert_eq!(json["total_cents"], -1200);
        assert!(json.get("key").is_none());
    }

    #[test]
    fn test_sort_order_defaults_to_date_desc() {
        assert_eq!(SortOrder::parse(Some("amount_asc")), SortOrder::AmountAsc);
        assert_eq!(SortOrder::parse(Some("bogus")), SortOrder::DateDesc);
        assert_eq!(SortOrder::parse(None), SortOrder::DateDesc);
    }
}
