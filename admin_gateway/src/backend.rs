use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GatewayConfig;
use crate::errors::GatewayError;
use crate::token::is_valid_token;

const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    detail: Option<String>,
}

/// Boundary with the backend's authentication endpoints.
///
/// The trait seam exists so the gateway can be exercised against counting
/// mocks; `HttpAuthBackend` is the production implementation.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange username/password for a bearer token at `POST /auth/login`.
    ///
    /// Distinguishes three failures that must never be conflated: the
    /// backend rejecting the credentials, the backend returning a
    /// structurally invalid token, and the backend being unreachable.
    async fn login(&self, username: &str, password: &str) -> Result<String, GatewayError>;

    /// Ask the backend whether it still accepts `token` via `GET /auth/me`.
    ///
    /// `Some(profile)` when accepted; `None` on any non-2xx response,
    /// timeout or transport error. The cause is logged, never surfaced to
    /// the end user.
    async fn validate(&self, token: &str) -> Option<serde_json::Value>;
}

pub struct HttpAuthBackend {
    client: reqwest::Client,
    api_base: String,
    login_timeout: Duration,
    token_check_timeout: Duration,
}

impl HttpAuthBackend {
    pub fn new(config: &GatewayConfig) -> Self {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(32)
            .build()
            .expect("Failed to create reqwest client");

        Self {
            client,
            api_base: config.backend_api_url.clone(),
            login_timeout: config.login_timeout,
            token_check_timeout: config.token_check_timeout,
        }
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, username: &str, password: &str) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(format!("{}/auth/login", self.api_base))
            .timeout(self.login_timeout)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Login request to backend failed: {}", e);
                GatewayError::UpstreamUnreachable(e.to_string())
            })?;

        if !response.status().is_success() {
            let detail = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.detail)
                .unwrap_or_else(|| INVALID_CREDENTIALS_MESSAGE.to_string());
            return Err(GatewayError::CredentialRejected(detail));
        }

        let response_body = response
            .text()
            .await
            .map_err(|e| GatewayError::UpstreamUnreachable(e.to_string()))?;
        let body: TokenResponse = serde_json::from_str(&response_body).map_err(|e| {
            tracing::error!("Login response was not a token payload: {}", e);
            GatewayError::MalformedToken
        })?;

        if !is_valid_token(&body.access_token) {
            tracing::error!("Backend returned a structurally invalid token");
            return Err(GatewayError::MalformedToken);
        }

        Ok(body.access_token)
    }

    async fn validate(&self, token: &str) -> Option<serde_json::Value> {
        let response = match self
            .client
            .get(format!("{}/auth/me", self.api_base))
            .bearer_auth(token)
            .timeout(self.token_check_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Could not verify token against backend: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Backend rejected token: {}", response.status());
            return None;
        }

        match response.json::<serde_json::Value>().await {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!("Profile payload was not valid JSON: {}", e);
                Some(serde_json::Value::Null)
            }
        }
    }
}
