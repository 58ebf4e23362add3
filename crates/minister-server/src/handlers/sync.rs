//! Sync handlers: fetch from the aggregator and rebuild the clean set

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    Json,
};
use serde::Serialize;

use minister_core::{clean_all, sync_transactions, SyncResult};

use super::AccountIdsRequest;
use crate::{read_optional_json, AppError, AppState};

#[derive(Serialize)]
pub struct CleanResult {
    pub count: usize,
}

#[derive(Serialize)]
pub struct FullSyncResponse {
    pub fetch: SyncResult,
    pub clean: CleanResult,
}

async fn fetch(state: &AppState, request: Request) -> Result<SyncResult, AppError> {
    let req: AccountIdsRequest = read_optional_json(request).await;
    sync_transactions(
        &state.store,
        state.aggregator.as_ref(),
        req.account_ids.as_deref(),
        &state.config.poll,
    )
    .await
    .map_err(AppError::upstream)
}

fn clean(state: &AppState) -> Result<CleanResult, AppError> {
    let _guard = state.store.lock();
    let count = clean_all(&state.store)?.len();
    Ok(CleanResult { count })
}

/// POST /api/sync - Fetch new transactions, then re-clean
pub async fn sync(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<FullSyncResponse>, AppError> {
    let fetch = fetch(&state, request).await?;
    let clean = clean(&state)?;
    Ok(Json(FullSyncResponse { fetch, clean }))
}

/// POST /api/sync/fetch - Fetch new transactions without re-cleaning
pub async fn sync_fetch(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<SyncResult>, AppError> {
    Ok(Json(fetch(&state, request).await?))
}

/// POST /api/sync/clean - Rebuild the clean set from raw transactions
pub async fn sync_clean(State(state): State<Arc<AppState>>) -> Result<Json<CleanResult>, AppError> {
    Ok(Json(clean(&state)?))
}
