use admin_gateway::AuthenticatedSession;

/// Admitted session data, inserted into request extensions by the gateway
/// middleware and available to every handler behind it.
#[derive(Clone, Debug)]
pub struct CurrentSession {
    pub session_id: String,
    /// Bearer token forwarded to the backend on proxied calls.
    pub token: String,
    pub username: String,
    /// Name shown in page headers.
    pub display_name: String,
    pub profile: Option<serde_json::Value>,
    /// Anti-forgery token expected in `X-CSRF-Token` on state-changing
    /// API calls.
    pub csrf_token: String,
}

impl From<&AuthenticatedSession> for CurrentSession {
    fn from(session: &AuthenticatedSession) -> Self {
        Self {
            session_id: session.session_id.clone(),
            token: session.record.token.clone(),
            username: session.record.username.clone(),
            display_name: session.record.display_name().to_string(),
            profile: session.record.profile.clone(),
            csrf_token: session.record.csrf_token.clone(),
        }
    }
}
