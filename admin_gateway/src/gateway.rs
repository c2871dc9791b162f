use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::backend::AuthBackend;
use crate::config::GatewayConfig;
use crate::cookie::CookieCodec;
use crate::errors::GatewayError;
use crate::session::{SessionRecord, SessionStore};
use crate::token::is_valid_token;
use crate::utils::gen_random_string;

const SESSION_ID_BYTES: usize = 32;
const CSRF_TOKEN_BYTES: usize = 32;

/// Why a request was refused. Recorded in logs only: every rejection is
/// indistinguishable from the outside (redirect to login, neutral status
/// message, cookies cleared).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// No live session and no persistent cookies.
    MissingCredentials,
    /// Exactly one of the two persistent cookies was present and decodable.
    /// Treated as tampering; the validator is never consulted for it.
    PartialCookiePair,
    /// Both cookies decoded but the token fails the structural check.
    MalformedRestoredToken,
    /// The backend no longer accepts the restored token.
    TokenNotAccepted,
}

#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub session_id: String,
    pub record: SessionRecord,
    /// True when the session was just rebuilt from the persistent cookie
    /// pair; the caller must issue the regenerated session cookie.
    pub restored: bool,
}

/// Outcome of the per-request gateway decision.
#[derive(Debug, Clone)]
pub enum Admission {
    Granted(AuthenticatedSession),
    Rejected(RejectionReason),
}

/// Everything a login handler needs to finish the response: the new session
/// plus the encrypted persistent cookie pair.
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub session_id: String,
    pub record: SessionRecord,
    pub token_cookie: String,
    pub username_cookie: String,
}

/// The session gateway: decides, for every request to a protected route,
/// whether it is admitted on a live session, admitted after restoring one
/// from the persistent cookie pair, or rejected to the login page.
pub struct Gateway {
    config: GatewayConfig,
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn SessionStore>,
    codec: CookieCodec,
}

impl Gateway {
    pub fn new(
        config: GatewayConfig,
        backend: Arc<dyn AuthBackend>,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, GatewayError> {
        let codec = CookieCodec::new(&config.encryption_key)?;
        Ok(Self {
            config,
            backend,
            store,
            codec,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn codec(&self) -> &CookieCodec {
        &self.codec
    }

    /// Gate a request to a protected route.
    ///
    /// A live session admits immediately with no backend call: validation
    /// cost is paid only at login and at cookie-restoration time. Without
    /// one, restoration from the cookie pair is attempted; every failure
    /// mode collapses into the same `Rejected` outcome.
    pub async fn authenticate(
        &self,
        session_id: Option<&str>,
        token_cookie: Option<&str>,
        username_cookie: Option<&str>,
    ) -> Admission {
        if let Some(session_id) = session_id {
            match self.store.get(session_id).await {
                Ok(Some(record)) => {
                    return Admission::Granted(AuthenticatedSession {
                        session_id: session_id.to_string(),
                        record,
                        restored: false,
                    });
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Session lookup failed: {}", e),
            }
        }

        self.restore_from_cookies(token_cookie, username_cookie)
            .await
    }

    async fn restore_from_cookies(
        &self,
        token_cookie: Option<&str>,
        username_cookie: Option<&str>,
    ) -> Admission {
        let token = token_cookie.and_then(|value| self.decrypt_cookie("token", value));
        let username = username_cookie.and_then(|value| self.decrypt_cookie("username", value));

        match (token, username) {
            (Some(token), Some(username)) if is_valid_token(&token) => {
                let Some(profile) = self.backend.validate(&token).await else {
                    tracing::info!(
                        "Restored token for '{}' is no longer accepted by the backend",
                        username
                    );
                    return Admission::Rejected(RejectionReason::TokenNotAccepted);
                };

                // The session identifier is regenerated before the restored
                // token is trusted; a browser-supplied identifier is never
                // reused across this boundary.
                match self
                    .create_session(token, username, non_null_profile(profile))
                    .await
                {
                    Ok(mut session) => {
                        session.restored = true;
                        Admission::Granted(session)
                    }
                    Err(e) => {
                        tracing::error!("Failed to create restored session: {}", e);
                        Admission::Rejected(RejectionReason::TokenNotAccepted)
                    }
                }
            }
            (Some(_), Some(_)) => {
                tracing::warn!("Persistent cookies decrypt to a structurally invalid token");
                Admission::Rejected(RejectionReason::MalformedRestoredToken)
            }
            (None, None) => Admission::Rejected(RejectionReason::MissingCredentials),
            _ => {
                // Partially restored cookies are treated as invalid without
                // spending a backend call on them.
                tracing::warn!("Partially restored login cookies are treated as invalid");
                Admission::Rejected(RejectionReason::PartialCookiePair)
            }
        }
    }

    fn decrypt_cookie(&self, label: &str, value: &str) -> Option<String> {
        match self.codec.decode(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!("Could not decrypt {} cookie: {}", label, e);
                None
            }
        }
    }

    async fn create_session(
        &self,
        token: String,
        username: String,
        profile: Option<serde_json::Value>,
    ) -> Result<AuthenticatedSession, GatewayError> {
        let session_id = gen_random_string(SESSION_ID_BYTES)?;
        let record = SessionRecord {
            token,
            username,
            profile,
            csrf_token: gen_random_string(CSRF_TOKEN_BYTES)?,
            expires_at: Utc::now() + Duration::minutes(self.config.session_lifetime_minutes as i64),
        };
        self.store.put(&session_id, record.clone()).await?;
        Ok(AuthenticatedSession {
            session_id,
            record,
            restored: false,
        })
    }

    /// Password login: exchange credentials for a token, create a fresh
    /// session and produce the encrypted persistent cookie pair.
    ///
    /// The profile fetch after a successful exchange is best-effort; its
    /// failure is logged and never fails the login.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginSuccess, GatewayError> {
        let token = self.backend.login(username, password).await?;

        let profile = match self.backend.validate(&token).await {
            Some(profile) => non_null_profile(profile),
            None => {
                tracing::warn!("Could not fetch user profile after login");
                None
            }
        };

        let session = self
            .create_session(token.clone(), username.to_string(), profile)
            .await?;
        let token_cookie = self.codec.encode(&token)?;
        let username_cookie = self.codec.encode(username)?;

        Ok(LoginSuccess {
            session_id: session.session_id,
            record: session.record,
            token_cookie,
            username_cookie,
        })
    }

    /// Look up a live session without attempting cookie restoration. Used by
    /// the login page to bounce already-authenticated visitors.
    pub async fn session(&self, session_id: &str) -> Option<SessionRecord> {
        match self.store.get(session_id).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Session lookup failed: {}", e);
                None
            }
        }
    }

    /// Destroy the session. The anti-forgery token dies with it; the caller
    /// clears the session cookie and both persistent cookies.
    pub async fn logout(&self, session_id: Option<&str>) {
        if let Some(session_id) = session_id {
            if let Err(e) = self.store.remove(session_id).await {
                tracing::warn!("Failed to remove session on logout: {}", e);
            }
        }
    }
}

fn non_null_profile(profile: serde_json::Value) -> Option<serde_json::Value> {
    if profile.is_null() { None } else { Some(profile) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InMemorySessionStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted backend that counts how often each endpoint is consulted.
    struct MockBackend {
        login_result: Result<String, GatewayError>,
        validate_result: Option<serde_json::Value>,
        login_calls: AtomicUsize,
        validate_calls: AtomicUsize,
    }

    impl MockBackend {
        fn new(
            login_result: Result<String, GatewayError>,
            validate_result: Option<serde_json::Value>,
        ) -> Arc<Self> {
            Arc::new(Self {
                login_result,
                validate_result,
                login_calls: AtomicUsize::new(0),
                validate_calls: AtomicUsize::new(0),
            })
        }

        fn validate_calls(&self) -> usize {
            self.validate_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AuthBackend for MockBackend {
        async fn login(&self, _username: &str, _password: &str) -> Result<String, GatewayError> {
            self.login_calls.fetch_add(1, Ordering::SeqCst);
            self.login_result.clone()
        }

        async fn validate(&self, _token: &str) -> Option<serde_json::Value> {
            self.validate_calls.fetch_add(1, Ordering::SeqCst);
            self.validate_result.clone()
        }
    }

    fn gateway_with(backend: Arc<MockBackend>) -> Gateway {
        Gateway::new(
            GatewayConfig::default(),
            backend,
            Arc::new(InMemorySessionStore::new()),
        )
        .expect("gateway construction should succeed")
    }

    fn accepting_backend() -> Arc<MockBackend> {
        MockBackend::new(
            Ok("aaa.bbb.ccc".to_string()),
            Some(json!({"username": "Administrator", "role": "admin"})),
        )
    }

    #[tokio::test]
    async fn test_login_creates_session_and_cookie_pair() {
        let backend = accepting_backend();
        let gateway = gateway_with(backend.clone());

        let success = gateway.login("admin", "correct").await.unwrap();

        // Session is live and holds the token plus the fetched profile
        let record = gateway.session(&success.session_id).await.unwrap();
        assert_eq!(record.token, "aaa.bbb.ccc");
        assert_eq!(record.username, "admin");
        assert_eq!(record.display_name(), "Administrator");
        assert!(!record.csrf_token.is_empty());

        // The cookie pair decrypts back to the raw values
        let codec = gateway.codec();
        assert_eq!(codec.decode(&success.token_cookie).unwrap(), "aaa.bbb.ccc");
        assert_eq!(codec.decode(&success.username_cookie).unwrap(), "admin");
    }

    #[tokio::test]
    async fn test_login_survives_profile_fetch_failure() {
        let backend = MockBackend::new(Ok("aaa.bbb.ccc".to_string()), None);
        let gateway = gateway_with(backend);

        let success = gateway.login("admin", "correct").await.unwrap();
        let record = gateway.session(&success.session_id).await.unwrap();
        assert!(record.profile.is_none());
        assert_eq!(record.display_name(), "admin");
    }

    #[tokio::test]
    async fn test_login_propagates_credential_rejection() {
        let backend = MockBackend::new(
            Err(GatewayError::CredentialRejected(
                "Неверные учетные данные".to_string(),
            )),
            None,
        );
        let gateway = gateway_with(backend.clone());

        let err = gateway.login("admin", "wrong").await.unwrap_err();
        match err {
            GatewayError::CredentialRejected(detail) => {
                assert_eq!(detail, "Неверные учетные данные")
            }
            other => panic!("Expected CredentialRejected, got {other:?}"),
        }
        // No session or cookies were produced, and no profile was fetched
        assert_eq!(backend.validate_calls(), 0);
    }

    #[tokio::test]
    async fn test_live_session_short_circuits_validation() {
        let backend = accepting_backend();
        let gateway = gateway_with(backend.clone());

        let success = gateway.login("admin", "correct").await.unwrap();
        let after_login = backend.validate_calls();

        // Repeated requests on the live session never consult the backend
        for _ in 0..3 {
            let admission = gateway
                .authenticate(Some(&success.session_id), None, None)
                .await;
            assert!(matches!(admission, Admission::Granted(ref s) if !s.restored));
        }
        assert_eq!(backend.validate_calls(), after_login);
    }

    #[tokio::test]
    async fn test_cookie_restoration_regenerates_session_id() {
        let backend = accepting_backend();
        let gateway = gateway_with(backend.clone());

        let token_cookie = gateway.codec().encode("aaa.bbb.ccc").unwrap();
        let username_cookie = gateway.codec().encode("admin").unwrap();

        // A return visit with no live session but both cookies intact
        let admission = gateway
            .authenticate(
                Some("attacker-chosen-session-id"),
                Some(&token_cookie),
                Some(&username_cookie),
            )
            .await;

        let Admission::Granted(session) = admission else {
            panic!("Expected restoration to be granted");
        };
        assert!(session.restored);
        assert_ne!(session.session_id, "attacker-chosen-session-id");
        assert_eq!(session.record.username, "admin");
        assert_eq!(backend.validate_calls(), 1);

        // The restored session is now live under the regenerated identifier
        assert!(gateway.session(&session.session_id).await.is_some());
    }

    #[tokio::test]
    async fn test_stale_cookie_is_rejected() {
        let backend = MockBackend::new(Ok("aaa.bbb.ccc".to_string()), None);
        let gateway = gateway_with(backend.clone());

        let token_cookie = gateway.codec().encode("aaa.bbb.ccc").unwrap();
        let username_cookie = gateway.codec().encode("admin").unwrap();

        let admission = gateway
            .authenticate(None, Some(&token_cookie), Some(&username_cookie))
            .await;

        assert!(matches!(
            admission,
            Admission::Rejected(RejectionReason::TokenNotAccepted)
        ));
        assert_eq!(backend.validate_calls(), 1);
    }

    #[tokio::test]
    async fn test_partial_cookie_pair_never_reaches_the_validator() {
        let backend = accepting_backend();
        let gateway = gateway_with(backend.clone());

        let token_cookie = gateway.codec().encode("aaa.bbb.ccc").unwrap();
        let username_cookie = gateway.codec().encode("admin").unwrap();

        // Token cookie only
        let admission = gateway.authenticate(None, Some(&token_cookie), None).await;
        assert!(matches!(
            admission,
            Admission::Rejected(RejectionReason::PartialCookiePair)
        ));

        // Username cookie only
        let admission = gateway
            .authenticate(None, None, Some(&username_cookie))
            .await;
        assert!(matches!(
            admission,
            Admission::Rejected(RejectionReason::PartialCookiePair)
        ));

        // One cookie undecodable counts as absent, leaving a partial pair
        let admission = gateway
            .authenticate(None, Some("corrupted-cookie"), Some(&username_cookie))
            .await;
        assert!(matches!(
            admission,
            Admission::Rejected(RejectionReason::PartialCookiePair)
        ));

        assert_eq!(backend.validate_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_credentials_are_rejected() {
        let backend = accepting_backend();
        let gateway = gateway_with(backend.clone());

        let admission = gateway.authenticate(None, None, None).await;
        assert!(matches!(
            admission,
            Admission::Rejected(RejectionReason::MissingCredentials)
        ));

        // An unknown session id with no cookies rejects the same way
        let admission = gateway.authenticate(Some("unknown"), None, None).await;
        assert!(matches!(
            admission,
            Admission::Rejected(RejectionReason::MissingCredentials)
        ));
        assert_eq!(backend.validate_calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_restored_token_skips_validation() {
        let backend = accepting_backend();
        let gateway = gateway_with(backend.clone());

        // Both cookies decrypt fine, but the token is not three segments
        let token_cookie = gateway.codec().encode("not a token").unwrap();
        let username_cookie = gateway.codec().encode("admin").unwrap();

        let admission = gateway
            .authenticate(None, Some(&token_cookie), Some(&username_cookie))
            .await;
        assert!(matches!(
            admission,
            Admission::Rejected(RejectionReason::MalformedRestoredToken)
        ));
        assert_eq!(backend.validate_calls(), 0);
    }

    #[tokio::test]
    async fn test_logout_destroys_the_session() {
        let backend = accepting_backend();
        let gateway = gateway_with(backend);

        let success = gateway.login("admin", "correct").await.unwrap();
        assert!(gateway.session(&success.session_id).await.is_some());

        gateway.logout(Some(&success.session_id)).await;
        assert!(gateway.session(&success.session_id).await.is_none());

        // Logging out without a session cookie is a no-op
        gateway.logout(None).await;
    }
}
