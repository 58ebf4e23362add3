//! Minister Web Server
//!
//! Axum-based REST API for the Minister personal finance tracker.
//!
//! - `/api/...` JSON endpoints for accounts, transactions, category rules,
//!   analytics, sync, balances, settings and backups
//! - `/config`, `/create-session`, `/save-account` for the account linking flow
//! - Optional static file fallback for the web client

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{error, info};

use minister_core::{Aggregator, AggregatorErrorKind, JsonStore, PollConfig};

mod handlers;

/// Maximum file upload size (10 MB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Maximum JSON request body size
pub const MAX_JSON_BODY: usize = 1024 * 1024;

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Publishable key handed to the linking UI via `/config`
    pub publishable_key: String,
    /// Refresh polling used by sync and balance refresh
    pub poll: PollConfig,
    /// Allowed CORS origins (empty = any origin)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
pub struct AppState {
    pub store: JsonStore,
    pub aggregator: Arc<dyn Aggregator>,
    pub config: ServerConfig,
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Success response with a human-readable message
#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Read a JSON request body, rejecting malformed input
pub(crate) async fn read_json<T: DeserializeOwned>(request: Request) -> Result<T, AppError> {
    let bytes = axum::body::to_bytes(request.into_body(), MAX_JSON_BODY)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))
}

/// Read an optional JSON request body; missing or malformed input yields the default
pub(crate) async fn read_optional_json<T: DeserializeOwned + Default>(request: Request) -> T {
    match axum::body::to_bytes(request.into_body(), MAX_JSON_BODY).await {
        Ok(bytes) if !bytes.is_empty() => serde_json::from_slice(&bytes).unwrap_or_default(),
        _ => T::default(),
    }
}

/// Create the application router
pub fn create_router(state: AppState, static_dir: Option<&str>) -> Router {
    let config = state.config.clone();
    let state = Arc::new(state);

    let api_routes = Router::new()
        // Accounts
        .route("/accounts", get(handlers::list_accounts))
        // Transactions
        .route("/transactions", get(handlers::list_transactions))
        .route("/transactions/pinned", get(handlers::list_pinned))
        .route(
            "/transactions/uncategorized",
            get(handlers::list_uncategorized),
        )
        .route("/transactions/:id", patch(handlers::update_transaction))
        .route(
            "/transactions/:id/categorize",
            post(handlers::categorize_transaction),
        )
        // Category rules
        .route(
            "/categories",
            get(handlers::list_rules).post(handlers::create_rule),
        )
        .route(
            "/categories/should-import-defaults",
            get(handlers::should_import_defaults),
        )
        .route(
            "/categories/import-defaults",
            post(handlers::import_defaults),
        )
        .route("/categories/test", post(handlers::test_categorization))
        .route(
            "/categories/:id",
            put(handlers::update_rule).delete(handlers::delete_rule),
        )
        // Analytics
        .route("/analytics/categories", get(handlers::category_analytics))
        .route("/analytics/monthly", get(handlers::monthly_analytics))
        .route("/analytics/weekly", get(handlers::weekly_analytics))
        // Sync
        .route("/sync", post(handlers::sync))
        .route("/sync/fetch", post(handlers::sync_fetch))
        .route("/sync/clean", post(handlers::sync_clean))
        // Balances
        .route("/balances", get(handlers::list_balances))
        .route("/balances/refresh", post(handlers::refresh_balances))
        // Settings
        .route("/stats", get(handlers::get_stats))
        .route(
            "/settings/reset-categories",
            post(handlers::reset_categories),
        )
        .route(
            "/settings/clear-categories",
            post(handlers::clear_categories),
        )
        .route("/settings/recategorize", post(handlers::recategorize))
        .route("/settings/clear-overrides", post(handlers::clear_overrides))
        .route("/settings/clear-pins", post(handlers::clear_pins))
        .route(
            "/settings/clear-transactions",
            post(handlers::clear_transactions),
        )
        .route("/settings/unlink-accounts", post(handlers::unlink_accounts))
        // Backup
        .route("/backup", get(handlers::download_backup))
        .route(
            "/backup/restore",
            post(handlers::restore_backup)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE + MAX_JSON_BODY)),
        );

    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    let mut app = Router::new()
        .nest("/api", api_routes)
        // Account linking flow
        .route("/config", get(handlers::get_config))
        .route("/create-session", post(handlers::create_session))
        .route("/save-account", post(handlers::save_account))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Serve static files if directory provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server
pub async fn serve(
    state: AppState,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
) -> anyhow::Result<()> {
    let app = create_router(state, static_dir);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }

    /// 500 that passes an aggregator failure through to the client
    ///
    /// Authentication and invalid-request failures get a more specific
    /// message; anything else is shown as-is.
    pub fn upstream(err: minister_core::Error) -> Self {
        let message = match err.aggregator_kind() {
            Some(AggregatorErrorKind::Authentication) => "Invalid Stripe API key".to_string(),
            Some(AggregatorErrorKind::InvalidRequest) => format!("Stripe error: {}", err),
            _ => err.to_string(),
        };
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
            internal: Some(err.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
