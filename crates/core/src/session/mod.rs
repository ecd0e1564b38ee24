//! Explicit session handles.
//!
//! A [`Session`] is attached to an [`AuthRequest`](crate::AuthRequest) by the
//! surrounding middleware, which loads it from a [`SessionStore`] before
//! authentication and commits it afterwards. Clones share the same state.

mod memory;

pub use memory::MemorySessionStore;

use serde_json::{Map, Value};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session backend error: {0}")]
    Backend(String),
}

/// Backing store for session data keyed by session id.
pub trait SessionStore: Send + Sync {
    fn load(&self, id: &str) -> Result<Option<Map<String, Value>>, SessionError>;

    fn save(&self, id: &str, data: &Map<String, Value>) -> Result<(), SessionError>;

    fn destroy(&self, id: &str) -> Result<(), SessionError>;
}

#[derive(Debug)]
struct SessionState {
    id: String,
    data: Map<String, Value>,
    previous_ids: Vec<String>,
    is_new: bool,
}

/// Shared handle over one client's session data.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<RwLock<SessionState>>,
}

impl Session {
    /// Start a fresh session with a random id.
    pub fn start() -> Self {
        Self::from_parts(uuid::Uuid::new_v4().to_string(), Map::new(), true)
    }

    /// Resume an existing session.
    pub fn resume(id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self::from_parts(id.into(), data, false)
    }

    fn from_parts(id: String, data: Map<String, Value>, is_new: bool) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionState {
                id,
                data,
                previous_ids: Vec::new(),
                is_new,
            })),
        }
    }

    pub fn id(&self) -> String {
        self.read_state(|state| state.id.clone())
    }

    /// Started by this request rather than loaded from a store.
    pub fn is_new(&self) -> bool {
        self.read_state(|state| state.is_new)
    }

    pub fn is_empty(&self) -> bool {
        self.read_state(|state| state.data.is_empty())
    }

    /// Whether the id has to be sent to the client (new or renewed).
    pub fn id_changed(&self) -> bool {
        self.read_state(|state| state.is_new || !state.previous_ids.is_empty())
    }

    pub fn read(&self, key: &str) -> Option<Value> {
        self.read_state(|state| state.data.get(key).cloned())
    }

    pub fn check(&self, key: &str) -> bool {
        self.read_state(|state| state.data.contains_key(key))
    }

    pub fn write(&self, key: &str, value: Value) {
        self.write_state(|state| {
            state.data.insert(key.to_string(), value);
        });
    }

    pub fn delete(&self, key: &str) {
        self.write_state(|state| {
            state.data.remove(key);
        });
    }

    /// Move the session data under a new id.
    pub fn renew(&self) {
        self.write_state(|state| {
            let old = std::mem::replace(&mut state.id, uuid::Uuid::new_v4().to_string());
            state.previous_ids.push(old);
        });
    }

    pub fn data(&self) -> Map<String, Value> {
        self.read_state(|state| state.data.clone())
    }

    /// Persist the session into `store`, dropping ids abandoned by `renew`.
    ///
    /// A session without data is destroyed instead of saved. Returns whether
    /// anything was stored under the current id.
    pub fn commit(&self, store: &dyn SessionStore) -> Result<bool, SessionError> {
        let (id, data, previous) = self.write_state(|state| {
            let previous = std::mem::take(&mut state.previous_ids);
            (state.id.clone(), state.data.clone(), previous)
        });
        for old in previous {
            store.destroy(&old)?;
        }
        if data.is_empty() {
            store.destroy(&id)?;
            return Ok(false);
        }
        store.save(&id, &data)?;
        Ok(true)
    }

    fn read_state<T>(&self, f: impl FnOnce(&SessionState) -> T) -> T {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write_state<T>(&self, f: impl FnOnce(&mut SessionState) -> T) -> T {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

/// Load the session named by `id` from `store`, or start a new one.
pub fn open_session(store: &dyn SessionStore, id: Option<&str>) -> Result<Session, SessionError> {
    if let Some(id) = id.filter(|id| !id.is_empty()) {
        if let Some(data) = store.load(id)? {
            return Ok(Session::resume(id, data));
        }
    }
    Ok(Session::start())
}
