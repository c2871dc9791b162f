use std::time::Duration;

use http::{Method, StatusCode};
use serde_json::{Value, json};

use crate::config::GatewayConfig;

/// Status and JSON body to hand back to the browser.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Forwards authenticated application requests to the backend with the
/// session's bearer token attached.
///
/// Three behaviors on top of transparent pass-through: a 401 whose `detail`
/// matches a session-expiry marker is normalized so the browser client can
/// trigger a re-login instead of showing a permission error; transport
/// failures become a uniform 502 body; everything else is passed through
/// unchanged. One attempt per caller-initiated action, no retries.
pub struct ProxyClient {
    client: reqwest::Client,
    api_base: String,
    session_expiry_markers: Vec<String>,
    timeout: Duration,
    slow_timeout: Duration,
}

impl ProxyClient {
    pub fn new(config: &GatewayConfig) -> Self {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(32)
            .build()
            .expect("Failed to create reqwest client");

        Self {
            client,
            api_base: config.backend_api_url.clone(),
            session_expiry_markers: config.session_expiry_markers.clone(),
            timeout: config.proxy_timeout,
            slow_timeout: config.proxy_slow_timeout,
        }
    }

    pub async fn forward(
        &self,
        token: &str,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> ProxyResponse {
        self.forward_with_timeout(token, method, path, body, self.timeout)
            .await
    }

    /// For known slow operations (menu sync against the POS backend).
    pub async fn forward_slow(
        &self,
        token: &str,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> ProxyResponse {
        self.forward_with_timeout(token, method, path, body, self.slow_timeout)
            .await
    }

    async fn forward_with_timeout(
        &self,
        token: &str,
        method: Method,
        path: &str,
        body: Option<Value>,
        timeout: Duration,
    ) -> ProxyResponse {
        let url = format!("{}{}", self.api_base, path);
        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(token)
            .timeout(timeout);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Proxy request to {} failed: {}", url, e);
                return ProxyResponse {
                    status: StatusCode::BAD_GATEWAY,
                    body: json!({"error": format!("Backend API connection error: {e}")}),
                };
            }
        };

        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        self.normalize(status, body)
    }

    /// Backend 401s that are specifically about the session/token are
    /// flagged with `session_expired` so a rich client can start a re-login
    /// flow; other 401/403s pass through untouched.
    fn normalize(&self, status: StatusCode, body: Value) -> ProxyResponse {
        if status == StatusCode::UNAUTHORIZED {
            if let Some(detail) = body.get("detail").and_then(Value::as_str) {
                if self
                    .session_expiry_markers
                    .iter()
                    .any(|marker| detail.contains(marker.as_str()))
                {
                    return ProxyResponse {
                        status,
                        body: json!({"error": detail, "session_expired": true}),
                    };
                }
            }
        }
        ProxyResponse { status, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy() -> ProxyClient {
        ProxyClient::new(&GatewayConfig::default())
    }

    #[test]
    fn test_401_with_marker_is_normalized() {
        let response = proxy().normalize(
            StatusCode::UNAUTHORIZED,
            json!({"detail": "Сессия истекла, авторизуйтесь заново"}),
        );

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.body["session_expired"], true);
        assert_eq!(
            response.body["error"],
            "Сессия истекла, авторизуйтесь заново"
        );
    }

    #[test]
    fn test_401_token_marker_is_normalized() {
        let response = proxy().normalize(
            StatusCode::UNAUTHORIZED,
            json!({"detail": "Недействительный токен"}),
        );
        assert_eq!(response.body["session_expired"], true);
    }

    #[test]
    fn test_401_without_marker_passes_through() {
        // A 401 about something other than the session keeps its payload
        let body = json!({"detail": "Недостаточно прав доступа"});
        let response = proxy().normalize(StatusCode::UNAUTHORIZED, body.clone());

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.body, body);
        assert!(response.body.get("session_expired").is_none());
    }

    #[test]
    fn test_non_401_statuses_pass_through() {
        let body = json!({"detail": "Сессия истекла"});
        // Even a marker match is ignored outside 401
        let response = proxy().normalize(StatusCode::FORBIDDEN, body.clone());
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(response.body, body);

        let ok = json!({"items": [1, 2, 3]});
        let response = proxy().normalize(StatusCode::OK, ok.clone());
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, ok);
    }

    #[test]
    fn test_401_with_non_string_detail_passes_through() {
        let body = json!({"detail": {"code": 42}});
        let response = proxy().normalize(StatusCode::UNAUTHORIZED, body.clone());
        assert_eq!(response.body, body);
    }

    #[test]
    fn test_configured_markers_override_defaults() {
        let config = GatewayConfig {
            session_expiry_markers: vec!["session expired".to_string()],
            ..GatewayConfig::default()
        };
        let proxy = ProxyClient::new(&config);

        let response = proxy.normalize(
            StatusCode::UNAUTHORIZED,
            json!({"detail": "your session expired"}),
        );
        assert_eq!(response.body["session_expired"], true);

        // The default Russian phrasing no longer matches
        let response = proxy.normalize(
            StatusCode::UNAUTHORIZED,
            json!({"detail": "Сессия истекла"}),
        );
        assert!(response.body.get("session_expired").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_backend_yields_bad_gateway() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = GatewayConfig {
            backend_api_url: format!("http://{addr}/api/v1"),
            ..GatewayConfig::default()
        };
        let proxy = ProxyClient::new(&config);

        let response = proxy
            .forward("aaa.bbb.ccc", Method::GET, "/status", None)
            .await;
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
        assert!(
            response.body["error"]
                .as_str()
                .unwrap()
                .starts_with("Backend API connection error")
        );
    }
}
