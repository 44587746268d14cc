use actix_session::storage::{LoadError, SaveError, SessionKey, SessionStore, UpdateError};
use actix_web::cookie::time::{Duration, OffsetDateTime};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

type State = HashMap<String, String>;

struct Entry {
    state: State,
    expires_at: OffsetDateTime,
}

/// Process-local session storage, shared by every worker.
///
/// Entries expire `ttl` after their last write. Expired entries are invisible
/// to `get` and are reclaimed by `prune_expired`, which the server runs on an
/// interval.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<State> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.expires_at > OffsetDateTime::now_utc())
            .map(|entry| entry.state.clone())
    }

    pub async fn set(&self, key: String, state: State, ttl: &Duration) {
        let expires_at = OffsetDateTime::now_utc() + *ttl;
        self.entries
            .write()
            .await
            .insert(key, Entry { state, expires_at });
    }

    pub async fn destroy(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Drops every expired entry and returns how many went.
    pub async fn prune_expired(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn generate_key() -> Result<SessionKey, anyhow::Error> {
    let raw = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    SessionKey::try_from(raw).map_err(|e| anyhow::anyhow!("Invalid session key: {}", e))
}

impl SessionStore for MemorySessionStore {
    async fn load(&self, session_key: &SessionKey) -> Result<Option<State>, LoadError> {
        Ok(self.get(session_key.as_ref()).await)
    }

    async fn save(&self, session_state: State, ttl: &Duration) -> Result<SessionKey, SaveError> {
        let session_key = generate_key().map_err(SaveError::Other)?;
        self.set(session_key.as_ref().to_string(), session_state, ttl)
            .await;
        Ok(session_key)
    }

    async fn update(
        &self,
        session_key: SessionKey,
        session_state: State,
        ttl: &Duration,
    ) -> Result<SessionKey, UpdateError> {
        self.set(session_key.as_ref().to_string(), session_state, ttl)
            .await;
        Ok(session_key)
    }

    async fn update_ttl(&self, session_key: &SessionKey, ttl: &Duration) -> Result<(), anyhow::Error> {
        let expires_at = OffsetDateTime::now_utc() + *ttl;
        if let Some(entry) = self.entries.write().await.get_mut(session_key.as_ref()) {
            entry.expires_at = expires_at;
        }
        Ok(())
    }

    async fn delete(&self, session_key: &SessionKey) -> Result<(), anyhow::Error> {
        self.destroy(session_key.as_ref()).await;
        Ok(())
    }
}
