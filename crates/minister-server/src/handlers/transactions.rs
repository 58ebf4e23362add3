//! Transaction listing, override and pin handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use minister_core::{
    clean_all, compile_pattern, next_rule_id, query_transactions, uncategorized, CategoryRule,
    CleanTransaction, TransactionPage, TransactionQuery, UNCATEGORIZED,
};

use crate::{read_json, AppError, AppState};

/// GET /api/transactions - Filtered, sorted, paginated clean transactions
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TransactionQuery>,
) -> Json<TransactionPage> {
    let transactions = state.store.load_clean_transactions();
    Json(query_transactions(&transactions, &query))
}

/// GET /api/transactions/pinned - IDs of pinned transactions
pub async fn list_pinned(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.store.load_pinned().into_iter().collect())
}

/// GET /api/transactions/uncategorized - Transactions no rule or override matched
pub async fn list_uncategorized(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<CleanTransaction>> {
    Json(uncategorized(&state.store.load_clean_transactions()))
}

/// Request body for updating a transaction
#[derive(Debug, Deserialize)]
pub struct UpdateTransactionRequest {
    pub category: Option<String>,
    pub pinned: Option<bool>,
}

#[derive(Serialize)]
pub struct UpdateTransactionResponse {
    pub success: bool,
    pub transaction: CleanTransaction,
    pub pinned: bool,
}

/// PATCH /api/transactions/:id - Set an override and/or pin a transaction
///
/// The clean record is patched in place; no full re-clean runs. Setting the
/// category to "Uncategorized" removes the override.
pub async fn update_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<UpdateTransactionResponse>, AppError> {
    let req: UpdateTransactionRequest = read_json(request).await?;
    if req.category.is_none() && req.pinned.is_none() {
        return Err(AppError::bad_request("category or pinned is required"));
    }

    let store = &state.store;
    let _guard = store.lock();

    let mut transactions = store.load_clean_transactions();
    let index = transactions
        .iter()
        .position(|tx| tx.id == id)
        .ok_or_else(|| AppError::not_found("Transaction not found"))?;

    let mut pinned = store.load_pinned();
    if let Some(pin) = req.pinned {
        if pin {
            pinned.insert(id.clone());
        } else {
            pinned.remove(&id);
        }
        store.save_pinned(&pinned)?;
    }

    if let Some(category) = req.category.filter(|c| !c.is_empty()) {
        let mut overrides = store.load_overrides();
        if category == UNCATEGORIZED {
            overrides.remove(&id);
        } else {
            overrides.insert(id.clone(), category.clone());
        }
        store.save_overrides(&overrides)?;

        transactions[index].category = category;
        store.save_clean_transactions(&transactions)?;
        info!("Set category of {} to '{}'", id, transactions[index].category);
    }

    Ok(Json(UpdateTransactionResponse {
        success: true,
        pinned: pinned.contains(&id),
        transaction: transactions.swap_remove(index),
    }))
}

/// Request body for categorizing a transaction
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizeRequest {
    pub category: Option<String>,
    #[serde(default)]
    pub create_rule: bool,
    pub rule_pattern: Option<String>,
}

#[derive(Serialize)]
pub struct CategorizeResponse {
    pub success: bool,
    pub category: String,
}

/// POST /api/transactions/:id/categorize - Override a category, optionally adding a rule
///
/// Re-cleans every transaction afterwards.
pub async fn categorize_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<CategorizeResponse>, AppError> {
    let req: CategorizeRequest = read_json(request).await?;
    let category = req
        .category
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::bad_request("Category is required"))?;

    let rule_pattern = req.rule_pattern.filter(|p| req.create_rule && !p.is_empty());
    if let Some(pattern) = &rule_pattern {
        compile_pattern(pattern, false)
            .map_err(|e| AppError::bad_request(&format!("Invalid regex pattern: {}", e)))?;
    }

    let store = &state.store;
    let _guard = store.lock();

    let mut overrides = store.load_overrides();
    overrides.insert(id.clone(), category.clone());
    store.save_overrides(&overrides)?;

    if let Some(pattern) = rule_pattern {
        let mut rules = store.load_category_rules();
        info!("Adding rule /{}/ -> '{}'", pattern, category);
        rules.push(CategoryRule {
            id: next_rule_id(&rules),
            category: category.clone(),
            pattern,
            case_sensitive: false,
        });
        store.save_category_rules(&rules)?;
    }

    clean_all(store)?;

    Ok(Json(CategorizeResponse {
        success: true,
        category,
    }))
}
