//! Cleaning pipeline: raw aggregator transactions → clean transactions
//!
//! Every pass recomputes the full clean set from the raw store and replaces
//! `transactions_clean.json`. Pinned transactions keep the category from the
//! previous clean set; everything else about them is recomputed.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::categorize::Categorizer;
use crate::error::Result;
use crate::models::{CleanStatusTransitions, CleanTransaction, StoredTransaction};
use crate::store::{JsonStore, Overrides};

/// Collapse runs of whitespace to a single space and trim the ends
pub fn normalize_description(description: &str) -> String {
    description.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// UTC calendar date for a unix timestamp (seconds); `None` when out of range
pub fn timestamp_to_date(timestamp: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive())
}

/// Date of a transaction timestamp, falling back to the epoch when out of range
fn transaction_date(tx_id: &str, field: &str, timestamp: i64) -> NaiveDate {
    timestamp_to_date(timestamp).unwrap_or_else(|| {
        warn!(
            "Transaction {} has out-of-range {} {}; using 1970-01-01",
            tx_id, field, timestamp
        );
        DateTime::<Utc>::default().date_naive()
    })
}

/// Project one raw transaction into a clean, categorized record
pub fn clean_transaction(
    tx: &StoredTransaction,
    categorizer: &Categorizer,
    overrides: &Overrides,
) -> CleanTransaction {
    let description = tx.description.as_deref().map(normalize_description);
    let category = categorizer.categorize(description.as_deref().unwrap_or(""), &tx.id, overrides);

    let date = transaction_date(&tx.id, "transacted_at", tx.transacted_at);
    let iso = |field: &str, ts: i64| {
        transaction_date(&tx.id, field, ts)
            .format("%Y-%m-%d")
            .to_string()
    };

    let status_transitions = tx
        .status_transitions
        .as_ref()
        .map(|st| CleanStatusTransitions {
            posted_at: st.posted_at.map(|ts| iso("posted_at", ts)),
            void_at: st.void_at.map(|ts| iso("void_at", ts)),
        });

    CleanTransaction {
        id: tx.id.clone(),
        amount: tx.amount,
        currency: tx.currency.clone(),
        description,
        status: Some(tx.status.clone()).filter(|s| !s.is_empty()),
        status_transitions,
        category,
        date: date.format("%Y-%m-%d").to_string(),
        year: date.year(),
        month: date.month(),
        account_id: Some(tx.account_id.clone()).filter(|s| !s.is_empty()),
        account_label: Some(tx.account_label.clone()).filter(|s| !s.is_empty()),
    }
}

/// Clean a batch of raw transactions
///
/// `previous` is the prior clean set; it is only consulted for pinned IDs.
pub fn clean_transactions(
    raw: &[StoredTransaction],
    categorizer: &Categorizer,
    overrides: &Overrides,
    pinned: &BTreeSet<String>,
    previous: &[CleanTransaction],
) -> Vec<CleanTransaction> {
    let prior_categories: HashMap<&str, &str> = if pinned.is_empty() {
        HashMap::new()
    } else {
        previous
            .iter()
            .filter(|tx| pinned.contains(&tx.id))
            .map(|tx| (tx.id.as_str(), tx.category.as_str()))
            .collect()
    };

    raw.iter()
        .map(|tx| {
            let mut cleaned = clean_transaction(tx, categorizer, overrides);
            if let Some(prior) = prior_categories.get(tx.id.as_str()) {
                if cleaned.category != *prior {
                    debug!(
                        "Pinned transaction {} keeps '{}' (rules say '{}')",
                        tx.id, prior, cleaned.category
                    );
                }
                cleaned.category = prior.to_string();
            }
            cleaned
        })
        .collect()
}

/// Recompute and persist the full clean transaction set
pub fn clean_all(store: &JsonStore) -> Result<Vec<CleanTransaction>> {
    let raw = store.load_transactions();
    let overrides = store.load_overrides();
    let pinned = store.load_pinned();
    let previous = if pinned.is_empty() {
        Vec::new()
    } else {
        store.load_clean_transactions()
    };

    let categorizer = Categorizer::new(
        &store.load_category_rules(),
        &store.load_default_category_rules()?,
    );

    let cleaned = clean_transactions(&raw, &categorizer, &overrides, &pinned, &previous);
    store.save_clean_transactions(&cleaned)?;

    info!(
        "Cleaned {} transactions ({} rules, {} overrides, {} pinned)",
        cleaned.len(),
        categorizer.len(),
        overrides.len(),
        pinned.len()
    );

    Ok(cleaned)
}
