//! Wallet endpoint client
//!
//! Balance creation and credit calls, bearer-token authenticated. Used to
//! fund the test account before driving room bets.

use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use super::{ApiClient, ApiError, ApiResult};

/// Payload for a wallet credit
#[derive(Debug, Clone, Serialize)]
pub struct DepositRequest {
    pub amount: f64,
    pub user_id: String,
    pub reference_id: String,
    pub metadata: Value,
}

impl DepositRequest {
    /// Create a deposit with empty metadata
    pub fn new(amount: f64, user_id: impl Into<String>, reference_id: impl Into<String>) -> Self {
        Self {
            amount,
            user_id: user_id.into(),
            reference_id: reference_id.into(),
            metadata: json!({}),
        }
    }

    /// Attach metadata
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

impl ApiClient {
    /// Create the user's wallet balance
    ///
    /// Empty-body POST; the server derives the user from the bearer token.
    pub async fn create_balance(&self, token: &str) -> ApiResult<Value> {
        let endpoint = format!("{}/wallet/create-user-balance", self.base_api);
        let response = self
            .http
            .post(&endpoint)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .body("")
            .send()
            .await?;

        let body = Self::json_or_status(&endpoint, response).await?;
        info!("Wallet balance created");
        Ok(body)
    }

    /// Credit the wallet
    pub async fn credit(&self, token: &str, deposit: &DepositRequest) -> ApiResult<Value> {
        let endpoint = format!("{}/wallet/credit", self.base_api);
        let response = self
            .http
            .post(&endpoint)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .json(deposit)
            .send()
            .await?;

        let body = Self::json_or_status(&endpoint, response).await?;
        info!("Deposited {}", deposit.amount);
        Ok(body)
    }

    /// Decode a successful response, or surface the server's message
    async fn json_or_status(endpoint: &str, response: reqwest::Response) -> ApiResult<Value> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| {
                body.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| status.to_string());

        Err(ApiError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message,
        })
    }
}
