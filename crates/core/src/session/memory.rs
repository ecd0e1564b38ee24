use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;

use super::{SessionError, SessionStore};

/// Default idle lifetime of a stored session.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
struct StoredSession {
    data: Map<String, Value>,
    last_access: DateTime<Utc>,
}

/// Process-local session store.
///
/// Sessions expire after `ttl` without a load or save. Expired entries are
/// swept whenever a session is saved and are never returned by `load`.
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, StoredSession>>,
    ttl: Duration,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of stored sessions, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired session and return how many were removed.
    pub fn evict_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        self.sweep(&mut sessions, now)
    }

    fn sweep(&self, sessions: &mut HashMap<String, StoredSession>, now: DateTime<Utc>) -> usize {
        let before = sessions.len();
        sessions.retain(|_, stored| !self.is_expired(stored, now));
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, "Evicted expired sessions");
        }
        evicted
    }

    fn is_expired(&self, stored: &StoredSession, now: DateTime<Utc>) -> bool {
        // A clock that went backwards keeps the session alive.
        (now - stored.last_access)
            .to_std()
            .is_ok_and(|idle| idle >= self.ttl)
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, id: &str) -> Result<Option<Map<String, Value>>, SessionError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let Some(stored) = sessions.get_mut(id) else {
            return Ok(None);
        };
        if self.is_expired(stored, now) {
            sessions.remove(id);
            return Ok(None);
        }
        stored.last_access = now;
        Ok(Some(stored.data.clone()))
    }

    fn save(&self, id: &str, data: &Map<String, Value>) -> Result<(), SessionError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        self.sweep(&mut sessions, now);
        sessions.insert(
            id.to_string(),
            StoredSession {
                data: data.clone(),
                last_access: now,
            },
        );
        Ok(())
    }

    fn destroy(&self, id: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data() -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("Auth".to_string(), json!({"id": 1}));
        data
    }

    #[test]
    fn test_load_returns_saved_data() {
        let store = MemorySessionStore::new();
        store.save("abc", &data()).unwrap();
        assert_eq!(store.load("abc").unwrap(), Some(data()));
        assert!(store.load("missing").unwrap().is_none());

        store.destroy("abc").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_expired_session_is_not_loaded() {
        let store = MemorySessionStore::with_ttl(Duration::ZERO);
        store.save("abc", &data()).unwrap();
        assert_eq!(store.len(), 1);

        assert!(store.load("abc").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_sweeps_expired_sessions() {
        let store = MemorySessionStore::with_ttl(Duration::ZERO);
        store.save("one", &data()).unwrap();
        store.save("two", &data()).unwrap();
        // Saving "two" swept "one".
        assert_eq!(store.len(), 1);
        assert_eq!(store.evict_expired(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_live_sessions_survive_eviction() {
        let store = MemorySessionStore::with_ttl(Duration::from_secs(3600));
        store.save("one", &data()).unwrap();
        store.save("two", &data()).unwrap();
        assert_eq!(store.evict_expired(), 0);
        assert_eq!(store.len(), 2);
    }
}
