//! Filtering, sorting and paging of clean transactions

use crate::models::{
    CleanTransaction, Pagination, SortOrder, TransactionPage, TransactionQuery, UNCATEGORIZED,
};

pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAX_PAGE_LIMIT: usize = 1000;

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn parse_positive(value: &Option<String>) -> Option<usize> {
    non_empty(value)
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .map(|n| n as usize)
}

/// Apply a listing query to the clean transaction set
pub fn query_transactions(
    transactions: &[CleanTransaction],
    query: &TransactionQuery,
) -> TransactionPage {
    let account = non_empty(&query.account).map(str::to_lowercase);
    let category = non_empty(&query.category).map(str::to_lowercase);
    let search = non_empty(&query.search).map(str::to_lowercase);
    let start_date = non_empty(&query.start_date);
    let end_date = non_empty(&query.end_date);

    let mut matched: Vec<&CleanTransaction> = transactions
        .iter()
        .filter(|tx| {
            account.as_deref().map_or(true, |acct| {
                tx.account_label
                    .as_deref()
                    .unwrap_or("")
                    .to_lowercase()
                    .contains(acct)
            })
        })
        .filter(|tx| category.as_deref().map_or(true, |cat| tx.category.to_lowercase() == cat))
        .filter(|tx| start_date.map_or(true, |start| tx.date.as_str() >= start))
        .filter(|tx| end_date.map_or(true, |end| tx.date.as_str() <= end))
        .filter(|tx| {
            search.as_deref().map_or(true, |q| {
                tx.description
                    .as_deref()
                    .unwrap_or("")
                    .to_lowercase()
                    .contains(q)
            })
        })
        .collect();

    match SortOrder::parse(query.sort.as_deref()) {
        SortOrder::DateAsc => matched.sort_by(|a, b| a.date.cmp(&b.date)),
        SortOrder::DateDesc => matched.sort_by(|a, b| b.date.cmp(&a.date)),
        SortOrder::AmountAsc => matched.sort_by_key(|tx| tx.amount),
        SortOrder::AmountDesc => matched.sort_by(|a, b| b.amount.cmp(&a.amount)),
    }

    let page = parse_positive(&query.page).unwrap_or(1);
    let limit = parse_positive(&query.limit)
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .min(MAX_PAGE_LIMIT);

    let total = matched.len();
    let start = page.saturating_sub(1).saturating_mul(limit).min(total);
    let end = start.saturating_add(limit).min(total);

    TransactionPage {
        data: matched[start..end].iter().map(|tx| (*tx).clone()).collect(),
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit),
        },
    }
}

/// Transactions no override or rule could categorize
pub fn uncategorized(transactions: &[CleanTransaction]) -> Vec<CleanTransaction> {
    transactions
        .iter()
        .filter(|tx| tx.category == UNCATEGORIZED)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(id: &str, date: &str, amount: i64, description: &str, category: &str) -> CleanTransaction {
        CleanTransaction {
            id: id.to_string(),
            amount,
            currency: Some("usd".to_string()),
            description: Some(description.to_string()),
            status: Some("posted".to_string()),
            status_transitions: None,
            category: category.to_string(),
            date: date.to_string(),
            year: 2024,
            month: 3,
            account_id: Some("fca_1".to_string()),
            account_label: Some("Chase Checking ****1234".to_string()),
        }
    }

    fn sample() -> Vec<CleanTransaction> {
        vec![
            tx("a", "2024-03-01", -450, "Blue Bottle Coffee", "Dining"),
            tx("b", "2024-03-05", -12000, "Whole Foods", "Groceries"),
            tx("c", "2024-03-03", 250000, "Payroll", "Income"),
            tx("d", "2024-03-04", -999, "Mystery Shop", UNCATEGORIZED),
        ]
    }

    fn ids(page: &TransactionPage) -> Vec<&str> {
        page.data.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let page = query_transactions(&sample(), &TransactionQuery::default());
        assert_eq!(ids(&page), vec!["b", "d", "c", "a"]);
        assert_eq!(
            page.pagination,
            Pagination {
                page: 1,
                limit: 50,
                total: 4,
                total_pages: 1
            }
        );
    }

    #[test]
    fn test_amount_sorts() {
        let asc = query_transactions(
            &sample(),
            &TransactionQuery {
                sort: Some("amount_asc".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(ids(&asc), vec!["b", "d", "a", "c"]);

        let desc = query_transactions(
            &sample(),
            &TransactionQuery {
                sort: Some("amount_desc".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(ids(&desc), vec!["c", "a", "d", "b"]);
    }

    #[test]
    fn test_search_and_category_filters_ignore_case() {
        let page = query_transactions(
            &sample(),
            &TransactionQuery {
                search: Some("COFFEE".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(ids(&page), vec!["a"]);

        let page = query_transactions(
            &sample(),
            &TransactionQuery {
                category: Some("groceries".to_string()),
                account: Some("chase".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(ids(&page), vec!["b"]);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let page = query_transactions(
            &sample(),
            &TransactionQuery {
                start_date: Some("2024-03-03".to_string()),
                end_date: Some("2024-03-04".to_string()),
                sort: Some("date_asc".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(ids(&page), vec!["c", "d"]);
    }

    #[test]
    fn test_pagination_slices_and_counts_pages() {
        let page = query_transactions(
            &sample(),
            &TransactionQuery {
                page: Some("2".to_string()),
                limit: Some("3".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(ids(&page), vec!["a"]);
        assert_eq!(page.pagination.total_pages, 2);

        let beyond = query_transactions(
            &sample(),
            &TransactionQuery {
                page: Some("9".to_string()),
                ..Default::default()
            },
        );
        assert!(beyond.data.is_empty());
        assert_eq!(beyond.pagination.total, 4);
    }

    #[test]
    fn test_malformed_paging_falls_back_to_defaults() {
        let page = query_transactions(
            &sample(),
            &TransactionQuery {
                page: Some("abc".to_string()),
                limit: Some("0".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(page.pagination.page, 1);
        assert_eq!(page.pagination.limit, DEFAULT_PAGE_LIMIT);

        let huge = query_transactions(
            &sample(),
            &TransactionQuery {
                limit: Some("1000000".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(huge.pagination.limit, MAX_PAGE_LIMIT);
    }

    #[test]
    fn test_empty_set_has_zero_pages() {
        let page = query_transactions(&[], &TransactionQuery::default());
        assert!(page.data.is_empty());
        assert_eq!(page.pagination.total_pages, 0);
    }

    #[test]
    fn test_uncategorized_filter() {
        let found = uncategorized(&sample());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "d");
    }
}
