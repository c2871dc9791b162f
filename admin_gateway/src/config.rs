use std::env;
use std::time::Duration;

use sha2::{Digest, Sha256};

const DEFAULT_BACKEND_API_URL: &str = "http://localhost:8000/api/v1";
const DEFAULT_SESSION_LIFETIME_MINUTES: u64 = 120;
const DEFAULT_COOKIE_ENCRYPTION_KEY: &str = "change-this-cookie-secret-in-production";

/// Phrases the backend is known to use in 401 `detail` messages when the
/// rejection is specifically about an expired session or invalid token,
/// as opposed to insufficient permissions on a resource.
const DEFAULT_SESSION_EXPIRY_MARKERS: [&str; 2] = ["Сессия", "токен"];

const LOGIN_TIMEOUT: Duration = Duration::from_secs(10);
const TOKEN_CHECK_TIMEOUT: Duration = Duration::from_secs(10);
const PROXY_TIMEOUT: Duration = Duration::from_secs(15);
const PROXY_SLOW_TIMEOUT: Duration = Duration::from_secs(60);

/// SameSite policy for the cookies this gateway issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
            SameSite::None => "None",
        }
    }
}

/// Configuration for the session gateway, resolved once at process start
/// and passed by handle to every component. Nothing here is re-read per
/// request and nothing lives in ambient statics.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the backend REST API, without a trailing slash.
    pub backend_api_url: String,
    /// Lifetime of the session and of the persistent login cookies.
    pub session_lifetime_minutes: u64,
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,
    pub cookie_same_site: SameSite,
    /// AES-256-GCM key for the persistent cookie codec, derived from the
    /// configured secret. Read-only after initialization.
    pub encryption_key: [u8; 32],
    /// Substrings of a backend 401 `detail` that mark it as a session/token
    /// rejection rather than an ordinary permission error.
    pub session_expiry_markers: Vec<String>,
    pub login_timeout: Duration,
    pub token_check_timeout: Duration,
    pub proxy_timeout: Duration,
    pub proxy_slow_timeout: Duration,
}

impl GatewayConfig {
    /// Resolve the configuration from environment variables, falling back to
    /// development defaults. Invalid values fall back with a warning rather
    /// than aborting startup.
    pub fn from_env() -> Self {
        let production = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let backend_api_url = env::var("BACKEND_API_URL")
            .unwrap_or_else(|_| DEFAULT_BACKEND_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let encryption_secret = env::var("COOKIE_ENCRYPTION_KEY").unwrap_or_else(|_| {
            if production {
                tracing::warn!("COOKIE_ENCRYPTION_KEY is not set; using the built-in default key");
            }
            DEFAULT_COOKIE_ENCRYPTION_KEY.to_string()
        });

        Self {
            backend_api_url,
            session_lifetime_minutes: resolve_lifetime_minutes(
                env::var("SESSION_LIFETIME_MINUTES").ok().as_deref(),
            ),
            cookie_domain: env::var("SESSION_COOKIE_DOMAIN")
                .ok()
                .filter(|v| !v.is_empty()),
            cookie_secure: resolve_cookie_secure(
                env::var("SESSION_SECURE_COOKIE").ok().as_deref(),
                production,
            ),
            cookie_same_site: resolve_same_site(env::var("SESSION_SAME_SITE").ok().as_deref()),
            encryption_key: derive_encryption_key(&encryption_secret),
            session_expiry_markers: resolve_expiry_markers(
                env::var("SESSION_EXPIRY_MARKERS").ok().as_deref(),
            ),
            login_timeout: LOGIN_TIMEOUT,
            token_check_timeout: TOKEN_CHECK_TIMEOUT,
            proxy_timeout: PROXY_TIMEOUT,
            proxy_slow_timeout: PROXY_SLOW_TIMEOUT,
        }
    }
}

impl Default for GatewayConfig {
    /// Development defaults, independent of the process environment.
    fn default() -> Self {
        Self {
            backend_api_url: DEFAULT_BACKEND_API_URL.to_string(),
            session_lifetime_minutes: DEFAULT_SESSION_LIFETIME_MINUTES,
            cookie_domain: None,
            cookie_secure: false,
            cookie_same_site: SameSite::Lax,
            encryption_key: derive_encryption_key(DEFAULT_COOKIE_ENCRYPTION_KEY),
            session_expiry_markers: DEFAULT_SESSION_EXPIRY_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            login_timeout: LOGIN_TIMEOUT,
            token_check_timeout: TOKEN_CHECK_TIMEOUT,
            proxy_timeout: PROXY_TIMEOUT,
            proxy_slow_timeout: PROXY_SLOW_TIMEOUT,
        }
    }
}

fn derive_encryption_key(secret: &str) -> [u8; 32] {
    let digest = Sha256::digest(secret.as_bytes());
    let mut key = [0u8; 32];
    key.copy_from_slice(digest.as_slice());
    key
}

fn resolve_lifetime_minutes(raw: Option<&str>) -> u64 {
    match raw {
        None => DEFAULT_SESSION_LIFETIME_MINUTES,
        Some(value) => match value.parse::<i64>() {
            Ok(minutes) if minutes > 0 => minutes as u64,
            _ => {
                tracing::warn!(
                    "Invalid SESSION_LIFETIME_MINUTES value {:?}, using default of {} minutes",
                    value,
                    DEFAULT_SESSION_LIFETIME_MINUTES
                );
                DEFAULT_SESSION_LIFETIME_MINUTES
            }
        },
    }
}

fn resolve_cookie_secure(raw: Option<&str>, production: bool) -> bool {
    let configured = raw.map(|v| !v.eq_ignore_ascii_case("false") && v != "0");
    match (configured, production) {
        (Some(false), true) => {
            tracing::warn!(
                "SESSION_SECURE_COOKIE is disabled, but secure cookies are forced in production"
            );
            true
        }
        (_, true) => true,
        (Some(secure), false) => secure,
        (None, false) => false,
    }
}

fn resolve_same_site(raw: Option<&str>) -> SameSite {
    match raw {
        None => SameSite::Lax,
        Some(value) => match value.to_lowercase().as_str() {
            "lax" => SameSite::Lax,
            "strict" => SameSite::Strict,
            "none" => SameSite::None,
            other => {
                tracing::warn!("Unknown SESSION_SAME_SITE value {:?}, using Lax", other);
                SameSite::Lax
            }
        },
    }
}

fn resolve_expiry_markers(raw: Option<&str>) -> Vec<String> {
    let markers: Vec<String> = raw
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if markers.is_empty() {
        DEFAULT_SESSION_EXPIRY_MARKERS
            .iter()
            .map(|m| m.to_string())
            .collect()
    } else {
        markers
    }
}
