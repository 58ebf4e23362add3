//! Spending breakdown handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};

use minister_core::{
    category_breakdown, monthly_breakdown, weekly_breakdown, AnalyticsFilters, BreakdownRow,
};

use crate::AppState;

/// GET /api/analytics/categories - Spending by category, largest first
pub async fn category_analytics(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<AnalyticsFilters>,
) -> Json<Vec<BreakdownRow>> {
    let transactions = state.store.load_clean_transactions();
    Json(category_breakdown(&transactions, &filters))
}

/// GET /api/analytics/monthly - Spending by calendar month
pub async fn monthly_analytics(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<AnalyticsFilters>,
) -> Json<Vec<BreakdownRow>> {
    let transactions = state.store.load_clean_transactions();
    Json(monthly_breakdown(&transactions, &filters))
}

/// GET /api/analytics/weekly - Spending by week (weeks start on Sunday)
pub async fn weekly_analytics(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<AnalyticsFilters>,
) -> Json<Vec<BreakdownRow>> {
    let transactions = state.store.load_clean_transactions();
    Json(weekly_breakdown(&transactions, &filters))
}
