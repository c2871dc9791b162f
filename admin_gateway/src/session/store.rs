use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::errors::GatewayError;

use super::types::SessionRecord;

/// Server-side session storage, keyed by opaque session identifier.
///
/// Entries are keyed per session and mutated only by the owning request's
/// handler, so distinct users never contend on the same entry.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, session_id: &str, record: SessionRecord) -> Result<(), GatewayError>;

    /// Fetch a live session. Expired records are evicted and reported as
    /// absent.
    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, GatewayError>;

    async fn remove(&self, session_id: &str) -> Result<(), GatewayError>;
}

pub struct InMemorySessionStore {
    entries: Mutex<HashMap<String, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory session store");
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, session_id: &str, record: SessionRecord) -> Result<(), GatewayError> {
        self.entries
            .lock()
            .await
            .insert(session_id.to_string(), record);
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, GatewayError> {
        let mut entries = self.entries.lock().await;
        match entries.get(session_id) {
            Some(record) if record.is_expired() => {
                tracing::debug!("Session expired at {}", record.expires_at);
                entries.remove(session_id);
                Ok(None)
            }
            Some(record) => Ok(Some(record.clone())),
            None => Ok(None),
        }
    }

    async fn remove(&self, session_id: &str) -> Result<(), GatewayError> {
        self.entries.lock().await.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn record() -> SessionRecord {
        SessionRecord {
            token: "aaa.bbb.ccc".to_string(),
            username: "admin".to_string(),
            profile: None,
            csrf_token: "csrf".to_string(),
            expires_at: Utc::now() + Duration::minutes(120),
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        // Given a store with one session
        let store = InMemorySessionStore::new();
        store.put("sid-1", record()).await.unwrap();

        // When fetching it
        let fetched = store.get("sid-1").await.unwrap();

        // Then the stored record comes back
        assert_eq!(fetched.unwrap().username, "admin");
    }

    #[tokio::test]
    async fn test_get_nonexistent_session() {
        let store = InMemorySessionStore::new();
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_evicted() {
        // Given a session that has already expired
        let store = InMemorySessionStore::new();
        let mut expired = record();
        expired.expires_at = Utc::now() - Duration::seconds(1);
        store.put("sid-1", expired).await.unwrap();

        // When fetching it
        let fetched = store.get("sid-1").await.unwrap();

        // Then it is reported absent and removed from the map
        assert!(fetched.is_none());
        assert!(store.entries.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = InMemorySessionStore::new();
        store.put("sid-1", record()).await.unwrap();
        store.remove("sid-1").await.unwrap();
        assert!(store.get("sid-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_nonexistent_session() {
        let store = InMemorySessionStore::new();
        assert!(store.remove("missing").await.is_ok());
    }

    #[tokio::test]
    async fn test_overwrite_existing_session() {
        let store = InMemorySessionStore::new();
        store.put("sid-1", record()).await.unwrap();

        let mut replacement = record();
        replacement.username = "operator".to_string();
        store.put("sid-1", replacement).await.unwrap();

        let fetched = store.get("sid-1").await.unwrap().unwrap();
        assert_eq!(fetched.username, "operator");
    }
}
