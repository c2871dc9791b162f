use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-side session state for one authenticated browser session.
///
/// Exactly one live token per session; the record is created on login or
/// cookie restoration, mutated only when the profile is refreshed, and
/// destroyed on logout or invalidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Bearer credential for the backend. Opaque to this system.
    pub token: String,
    pub username: String,
    /// Last fetched user profile (role, display name). Best-effort.
    pub profile: Option<serde_json::Value>,
    /// Anti-forgery token, regenerated with the session.
    pub csrf_token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// Display name for page headers: the profile's username when a profile
    /// was fetched, otherwise the login username.
    pub fn display_name(&self) -> &str {
        self.profile
            .as_ref()
            .and_then(|profile| profile.get("username"))
            .and_then(|value| value.as_str())
            .unwrap_or(&self.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn record(profile: Option<serde_json::Value>) -> SessionRecord {
        SessionRecord {
            token: "aaa.bbb.ccc".to_string(),
            username: "admin".to_string(),
            profile,
            csrf_token: "csrf".to_string(),
            expires_at: Utc::now() + Duration::minutes(120),
        }
    }

    #[test]
    fn test_expiry() {
        let mut session = record(None);
        assert!(!session.is_expired());

        session.expires_at = Utc::now() - Duration::seconds(1);
        assert!(session.is_expired());
    }

    #[test]
    fn test_display_name_prefers_profile() {
        let session = record(Some(json!({"username": "Administrator", "role": "admin"})));
        assert_eq!(session.display_name(), "Administrator");
    }

    #[test]
    fn test_display_name_falls_back_to_login_username() {
        assert_eq!(record(None).display_name(), "admin");
        // A profile without a username field falls back too
        let session = record(Some(json!({"role": "admin"})));
        assert_eq!(session.display_name(), "admin");
    }

    #[test]
    fn test_serde_roundtrip() {
        let session = record(Some(json!({"username": "Administrator"})));
        let serialized = serde_json::to_string(&session).expect("Failed to serialize");
        let deserialized: SessionRecord =
            serde_json::from_str(&serialized).expect("Failed to deserialize");
        assert_eq!(deserialized.token, session.token);
        assert_eq!(deserialized.username, session.username);
        assert_eq!(deserialized.profile, session.profile);
        assert_eq!(deserialized.csrf_token, session.csrf_token);
    }
}
