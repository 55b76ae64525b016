//! Login endpoint client
//!
//! Retrieves the bearer token the WebSocket layer authenticates with.
//! Backend deployments disagree on the login path and on the field the token
//! comes back under, so the client probes a list of known paths and accepts
//! every spelling it has seen in the wild.

use reqwest::header::ACCEPT;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::{ApiError, ApiResult};

/// Login paths probed after the configured endpoint
const FALLBACK_LOGIN_PATHS: &[&str] = &[
    "/iam/login",
    "/api/auth/login",
    "/auth/login",
    "/api/login",
    "/login",
];

/// Credentials posted to the login endpoint
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub remember_me: bool,
}

impl LoginRequest {
    /// Create a new login request
    pub fn new(username: impl Into<String>, password: impl Into<String>, remember_me: bool) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            remember_me,
        }
    }
}

/// A successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The bearer token to authenticate with
    pub access_token: String,
    /// The endpoint that accepted the credentials
    pub endpoint: String,
}

/// HTTP client for the backend's REST endpoints
pub struct ApiClient {
    pub(super) http: reqwest::Client,
    pub(super) base_api: String,
    login_endpoint: String,
}

impl ApiClient {
    /// Create a new client for the given API base URL
    pub fn new(base_api: impl Into<String>, login_endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_api: base_api.into(),
            login_endpoint: login_endpoint.into(),
        }
    }

    /// Log in and extract the bearer token
    ///
    /// Tries the configured endpoint first, then the fallback paths. A
    /// candidate that is unreachable, rejects the credentials, or answers
    /// without a recognizable token just moves probing along to the next.
    pub async fn login(&self, request: &LoginRequest) -> ApiResult<LoginOutcome> {
        for endpoint in self.login_candidates() {
            debug!("Trying login endpoint {}", endpoint);

            let response = match self
                .http
                .post(&endpoint)
                .header(ACCEPT, "application/json")
                .json(request)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    debug!("Login endpoint {} unreachable: {}", endpoint, e);
                    continue;
                }
            };

            if !response.status().is_success() {
                debug!("Login endpoint {} returned {}", endpoint, response.status());
                continue;
            }

            let body: Value = match response.json().await {
                Ok(body) => body,
                Err(e) => {
                    debug!("Login endpoint {} returned non-JSON body: {}", endpoint, e);
                    continue;
                }
            };

            if let Some(access_token) = extract_access_token(&body) {
                info!("Logged in via {}", endpoint);
                return Ok(LoginOutcome {
                    access_token,
                    endpoint,
                });
            }
        }

        Err(ApiError::LoginFailed)
    }

    /// Candidate login URLs, configured endpoint first, deduplicated
    fn login_candidates(&self) -> Vec<String> {
        let mut candidates = vec![format!("{}{}", self.base_api, self.login_endpoint)];
        for path in FALLBACK_LOGIN_PATHS {
            let url = format!("{}{}", self.base_api, path);
            if !candidates.contains(&url) {
                candidates.push(url);
            }
        }
        candidates
    }
}

/// Pull the bearer token out of a login response body
///
/// Accepted spellings: `access_token`, `accessToken`, `token`, and the same
/// nested under `data`.
pub fn extract_access_token(body: &Value) -> Option<String> {
    for key in ["access_token", "accessToken", "token"] {
        if let Some(token) = body.get(key).and_then(Value::as_str) {
            return Some(token.to_string());
        }
    }

    let data = body.get("data")?;
    for key in ["access_token", "token"] {
        if let Some(token) = data.get(key).and_then(Value::as_str) {
            return Some(token.to_string());
        }
    }

    None
}
