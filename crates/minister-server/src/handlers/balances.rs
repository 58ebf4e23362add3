//! Account balance handlers

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use minister_core::{balances as balance_cache, AccountBalance};

use super::AccountIdsRequest;
use crate::{read_optional_json, AppError, AppState};

/// GET /api/balances - Cached balance per linked account
pub async fn list_balances(State(state): State<Arc<AppState>>) -> Json<Vec<AccountBalance>> {
    Json(balance_cache::list_balances(&state.store))
}

/// POST /api/balances/refresh - Refresh balances from the aggregator
///
/// Answers `{"error": "No accounts to refresh"}` with a 200 when nothing matches.
pub async fn refresh_balances(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, AppError> {
    let req: AccountIdsRequest = read_optional_json(request).await;
    let balances = balance_cache::refresh_balances(
        &state.store,
        state.aggregator.as_ref(),
        req.account_ids.as_deref(),
        &state.config.poll,
    )
    .await
    .map_err(AppError::upstream)?;

    if balances.is_empty() {
        return Ok(Json(json!({ "error": "No accounts to refresh" })).into_response());
    }
    Ok(Json(balances).into_response())
}
