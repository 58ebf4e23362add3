//! Spending breakdowns over clean transactions
//!
//! Only expenses count: amount < 0 and category other than "Transfer".
//! Totals stay negative; the formatted `total` string drops the sign.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::{AnalyticsFilters, BreakdownRow, CleanTransaction, GroupBy, TRANSFER};

/// Format cents as "$D.CC" using the absolute value
pub fn format_dollars(cents: i64) -> String {
    let abs = cents.unsigned_abs();
    format!("${}.{:02}", abs / 100, abs % 100)
}

/// ISO date of the Sunday starting the week that contains `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

/// Apply the expenses-only base filter plus any optional filters
pub fn apply_filters<'a>(
    transactions: &'a [CleanTransaction],
    filters: &AnalyticsFilters,
) -> Vec<&'a CleanTransaction> {
    let account = filters.account.as_deref().map(str::to_lowercase);
    let category = filters.category.as_deref().map(str::to_lowercase);

    transactions
        .iter()
        .filter(|tx| tx.amount < 0 && tx.category != TRANSFER)
        .filter(|tx| match filters.start_date.as_deref() {
            Some(start) if !start.is_empty() => tx.date.as_str() >= start,
            _ => true,
        })
        .filter(|tx| match filters.end_date.as_deref() {
            Some(end) if !end.is_empty() => tx.date.as_str() <= end,
            _ => true,
        })
        .filter(|tx| match account.as_deref() {
            Some(acct) if !acct.is_empty() => tx
                .account_label
                .as_deref()
                .unwrap_or("")
                .to_lowercase()
                .contains(acct),
            _ => true,
        })
        .filter(|tx| match category.as_deref() {
            Some(cat) if !cat.is_empty() => tx.category.to_lowercase() == cat,
            _ => true,
        })
        .collect()
}

fn group_key(tx: &CleanTransaction, group_by: GroupBy) -> Option<String> {
    match group_by {
        GroupBy::Category => Some(tx.category.clone()),
        GroupBy::Month => Some(format!("{}-{:02}", tx.year, tx.month)),
        GroupBy::Week => NaiveDate::parse_from_str(&tx.date, "%Y-%m-%d")
            .ok()
            .map(|d| week_start(d).format("%Y-%m-%d").to_string()),
    }
}

/// Group qualifying transactions and sum their signed amounts
///
/// Categories sort by total ascending (largest expense first); months and
/// weeks sort chronologically.
pub fn breakdown(
    transactions: &[CleanTransaction],
    filters: &AnalyticsFilters,
    group_by: GroupBy,
) -> Vec<BreakdownRow> {
    let mut groups: HashMap<String, (usize, i64)> = HashMap::new();
    for tx in apply_filters(transactions, filters) {
        let Some(key) = group_key(tx, group_by) else {
            continue;
        };
        let entry = groups.entry(key).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += tx.amount;
    }

    let mut rows: Vec<BreakdownRow> = groups
        .into_iter()
        .map(|(key, (count, total_cents))| BreakdownRow {
            group_by,
            key,
            count,
            total_cents,
            total: format_dollars(total_cents),
        })
        .collect();

    match group_by {
        // Tie-break on key so equal totals come out in a stable order
        GroupBy::Category => rows.sort_by(|a, b| {
            a.total_cents
                .cmp(&b.total_cents)
                .then_with(|| a.key.cmp(&b.key))
        }),
        GroupBy::Month | GroupBy::Week => rows.sort_by(|a, b| a.key.cmp(&b.key)),
    }

    rows
}

pub fn category_breakdown(
    transactions: &[CleanTransaction],
    filters: &AnalyticsFilters,
) -> Vec<BreakdownRow> {
    breakdown(transactions, filters, GroupBy::Category)
}

pub fn monthly_breakdown(
    transactions: &[CleanTransaction],
    filters: &AnalyticsFilters,
) -> Vec<BreakdownRow> {
    breakdown(transactions, filters, GroupBy::Month)
}

pub fn weekly_breakdown(
    transactions: &[CleanTransaction],
    filters: &AnalyticsFilters,
) -> Vec<BreakdownRow> {
    breakdown(transactions, filters, GroupBy::Week)
}
