/// Key-value store abstraction with per-key TTL.
///
/// [`MemoryStore`] keeps entries in a map guarded by [`parking_lot::RwLock`]
/// and expires them lazily on access. Deadlines use [`tokio::time::Instant`],
/// so tests can drive expiry with a paused clock.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::time::Instant;

use crate::error::SessionError;

/// Single-key operations of an external key-value store.
///
/// Each call is atomic on its own; nothing here spans keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), SessionError>;

    async fn get(&self, key: &str) -> Result<Option<String>, SessionError>;

    async fn exists(&self, key: &str) -> Result<bool, SessionError>;

    async fn delete(&self, key: &str) -> Result<(), SessionError>;

    /// Resets the TTL of an existing key. Returns `false` when the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, SessionError>;

    /// Remaining TTL, or `None` when the key is absent.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, SessionError>;
}

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-memory key-value store
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys that have not expired yet
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().values().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
                None => return None,
                Some(_) => {}
            }
        }
        // expired: drop it unless another writer refreshed it meanwhile
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        None
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), SessionError> {
        self.entries.write().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.live_value(key))
    }

    async fn exists(&self, key: &str) -> Result<bool, SessionError> {
        Ok(self.live_value(key).is_some())
    }

    async fn delete(&self, key: &str) -> Result<(), SessionError> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, SessionError> {
        let now = Instant::now();
        let mut entries = self.entries.write();
        match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.expires_at = now + ttl;
                Ok(true)
            }
            Some(_) => {
                entries.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, SessionError> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.expires_at - now))
    }
}
