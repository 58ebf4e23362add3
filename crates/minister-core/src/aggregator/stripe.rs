//! Stripe Financial Connections client
//!
//! Requests are form-encoded with the secret key as a bearer token.
//! Stripe error bodies (`{"error": {"type", "message"}}`) are mapped to
//! [`AggregatorErrorKind`]s.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::{AggregatorErrorKind, Error, Result};

use super::{Aggregator, AggregatorAccount, RefreshFeature, TransactionListPage, TRANSACTION_PAGE_SIZE};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Session {
    client_secret: String,
}

/// Stripe API client
#[derive(Clone)]
pub struct StripeClient {
    http_client: Client,
    base_url: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: DEFAULT_API_BASE.to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    /// Point the client at a different API host (e.g. a local stub)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| Error::aggregator(AggregatorErrorKind::Connection, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_response(status, &body));
        }

        Ok(response.json().await?)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, form: &[(&str, &str)]) -> Result<T> {
        debug!("Stripe POST /v1/{}", path);
        self.send(self.http_client.post(self.url(path)).form(form)).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        debug!("Stripe GET /v1/{}", path);
        self.send(self.http_client.get(self.url(path)).query(query)).await
    }
}

/// Map a non-success Stripe response to an aggregator error
fn error_from_response(status: StatusCode, body: &str) -> Error {
    let detail = serde_json::from_str::<StripeErrorBody>(body).ok().map(|b| b.error);
    let message = detail
        .as_ref()
        .and_then(|d| d.message.clone())
        .unwrap_or_else(|| format!("Stripe API error {}", status));

    let kind = match detail.as_ref().map(|d| d.kind.as_str()) {
        _ if status == StatusCode::UNAUTHORIZED => AggregatorErrorKind::Authentication,
        Some("authentication_error") => AggregatorErrorKind::Authentication,
        Some("invalid_request_error") => AggregatorErrorKind::InvalidRequest,
        _ => AggregatorErrorKind::Api,
    };

    Error::aggregator(kind, message)
}

#[async_trait]
impl Aggregator for StripeClient {
    async fn refresh_account(&self, account_id: &str, feature: RefreshFeature) -> Result<()> {
        let _: serde_json::Value = self
            .post(
                &format!("financial_connections/accounts/{}/refresh", account_id),
                &[("features[]", feature.as_str())],
            )
            .await?;
        Ok(())
    }

    async fn retrieve_account(&self, account_id: &str) -> Result<AggregatorAccount> {
        self.get(&format!("financial_connections/accounts/{}", account_id), &[])
            .await
    }

    async fn list_transactions(
        &self,
        account_id: &str,
        starting_after: Option<&str>,
    ) -> Result<TransactionListPage> {
        let limit = TRANSACTION_PAGE_SIZE.to_string();
        let mut query = vec![("account", account_id), ("limit", limit.as_str())];
        if let Some(cursor) = starting_after {
            query.push(("starting_after", cursor));
        }
        self.get("financial_connections/transactions", &query).await
    }

    async fn subscribe_account(&self, account_id: &str) -> Result<()> {
        let _: serde_json::Value = self
            .post(
                &format!("financial_connections/accounts/{}/subscribe", account_id),
                &[("features[]", RefreshFeature::Transactions.as_str())],
            )
            .await?;
        Ok(())
    }

    async fn create_customer(&self) -> Result<String> {
        let customer: Created = self.post("customers", &[]).await?;
        Ok(customer.id)
    }

    async fn create_session(&self, customer_id: &str) -> Result<String> {
        let session: Session = self
            .post(
                "financial_connections/sessions",
                &[
                    ("account_holder[type]", "customer"),
                    ("account_holder[customer]", customer_id),
                    ("permissions[]", "transactions"),
                    ("permissions[]", "balances"),
                    ("prefetch[]", "transactions"),
                ],
            )
            .await?;
        Ok(session.client_secret)
    }
}
