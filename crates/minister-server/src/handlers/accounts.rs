//! Linked account and account-linking handlers

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use minister_core::LinkedAccount;

use crate::{read_json, AppError, AppState};

/// GET /api/accounts - List linked accounts
pub async fn list_accounts(State(state): State<Arc<AppState>>) -> Json<Vec<LinkedAccount>> {
    Json(state.store.read_account_data().accounts)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub publishable_key: String,
}

/// GET /config - Publishable key for the linking UI
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<ClientConfig> {
    Json(ClientConfig {
        publishable_key: state.config.publishable_key.clone(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub client_secret: String,
}

/// POST /create-session - Start a Financial Connections linking session
///
/// Creates the aggregator customer on first use.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionResponse>, AppError> {
    let customer_id = match state.store.read_account_data().customer_id {
        Some(id) => id,
        None => {
            let created = state
                .aggregator
                .create_customer()
                .await
                .map_err(AppError::upstream)?;

            let _guard = state.store.lock();
            let mut data = state.store.read_account_data();
            // Another request may have created one while we were waiting
            let id = data.customer_id.get_or_insert(created).clone();
            state.store.write_account_data(&data)?;
            info!("Using aggregator customer {}", id);
            id
        }
    };

    let client_secret = state
        .aggregator
        .create_session(&customer_id)
        .await
        .map_err(AppError::upstream)?;

    Ok(Json(SessionResponse { client_secret }))
}

/// Request body for saving a linked account
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAccountRequest {
    pub account_id: Option<String>,
    pub institution: Option<String>,
    pub display_name: Option<String>,
    pub last4: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAccountResponse {
    pub success: bool,
    pub account_id: String,
}

/// POST /save-account - Record an account returned by the linking UI
pub async fn save_account(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<SaveAccountResponse>, AppError> {
    let req: SaveAccountRequest = read_json(request).await?;
    let account_id = req
        .account_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::bad_request("accountId is required"))?;

    if let Err(e) = state.aggregator.subscribe_account(&account_id).await {
        warn!("Subscribe skipped for {} (account may be inactive): {}", account_id, e);
    }

    let _guard = state.store.lock();
    let mut data = state.store.read_account_data();
    if !data.accounts.iter().any(|a| a.id == account_id) {
        data.accounts.push(LinkedAccount {
            id: account_id.clone(),
            institution: req.institution,
            display_name: req.display_name,
            last4: req.last4,
            linked_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        state.store.write_account_data(&data)?;
        info!("Linked account {}", account_id);
    }

    Ok(Json(SaveAccountResponse {
        success: true,
        account_id,
    }))
}
