//! Store statistics and maintenance handlers

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;

use minister_core::{clean_all, AccountData, Overrides, Stats};

use crate::{AppError, AppState, MessageResponse};

/// GET /api/stats - Record counts across the store
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<Stats>, AppError> {
    Ok(Json(state.store.stats()?))
}

#[derive(Serialize)]
pub struct ResetCategoriesResponse {
    pub success: bool,
    pub count: usize,
    pub message: String,
}

/// POST /api/settings/reset-categories - Replace user rules with the defaults
pub async fn reset_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ResetCategoriesResponse>, AppError> {
    let store = &state.store;
    let _guard = store.lock();
    let defaults = store.load_default_category_rules()?;
    if defaults.is_empty() {
        return Err(AppError::bad_request("No default rules available"));
    }

    store.save_category_rules(&defaults)?;
    store.save_deleted_defaults(&BTreeSet::new())?;
    clean_all(store)?;

    info!("Reset category rules to {} defaults", defaults.len());
    Ok(Json(ResetCategoriesResponse {
        success: true,
        count: defaults.len(),
        message: format!("Reset to {} default rules", defaults.len()),
    }))
}

/// POST /api/settings/clear-categories - Remove every user rule
pub async fn clear_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, AppError> {
    let store = &state.store;
    let _guard = store.lock();
    store.save_category_rules(&[])?;
    store.save_deleted_defaults(&BTreeSet::new())?;
    clean_all(store)?;

    info!("Cleared category rules");
    Ok(Json(MessageResponse::new("Cleared all category rules")))
}

/// POST /api/settings/recategorize - Re-run categorization over every transaction
pub async fn recategorize(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, AppError> {
    let _guard = state.store.lock();
    clean_all(&state.store)?;
    Ok(Json(MessageResponse::new("Re-categorization complete")))
}

/// POST /api/settings/clear-overrides - Drop every manual category
pub async fn clear_overrides(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, AppError> {
    let store = &state.store;
    let _guard = store.lock();
    store.save_overrides(&Overrides::new())?;
    clean_all(store)?;

    info!("Cleared category overrides");
    Ok(Json(MessageResponse::new("Cleared all category overrides")))
}

/// POST /api/settings/clear-pins - Unpin every transaction
///
/// Categories stay as they are until the next re-clean.
pub async fn clear_pins(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, AppError> {
    let _guard = state.store.lock();
    state.store.save_pinned(&BTreeSet::new())?;
    Ok(Json(MessageResponse::new("Cleared all pinned transactions")))
}

/// POST /api/settings/clear-transactions - Delete raw and clean transactions and overrides
pub async fn clear_transactions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, AppError> {
    let store = &state.store;
    let _guard = store.lock();
    store.save_transactions(&[])?;
    store.save_clean_transactions(&[])?;
    store.save_overrides(&Overrides::new())?;

    info!("Cleared transaction data");
    Ok(Json(MessageResponse::new("Cleared all transaction data")))
}

/// POST /api/settings/unlink-accounts - Forget every linked account
pub async fn unlink_accounts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, AppError> {
    let _guard = state.store.lock();
    state.store.write_account_data(&AccountData::default())?;

    info!("Unlinked all accounts");
    Ok(Json(MessageResponse::new("Unlinked all accounts")))
}
