/// Session Registry
///
/// Records which tokens are live in an external key-value store so that
/// self-contained tokens can still be revoked server-side. A session is two
/// entries with independent TTLs:
///
/// - `session:<username>` → token
/// - `token:<token>` → username
///
/// The `token:` entry is the source of truth for liveness. The two writes in
/// `store` and the two deletes in `invalidate` are not atomic; a crash between
/// them leaves a half-written session that TTL expiry cleans up.

mod redis_store;
mod store;

use std::sync::Arc;
use std::time::Duration;

use crate::error::SessionError;

pub use redis_store::RedisStore;
pub use store::{KeyValueStore, MemoryStore};

const SESSION_PREFIX: &str = "session:";
const TOKEN_PREFIX: &str = "token:";

pub fn session_key(username: &str) -> String {
    format!("{}{}", SESSION_PREFIX, username)
}

pub fn token_key(token: &str) -> String {
    format!("{}{}", TOKEN_PREFIX, token)
}

#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Record a session in both directions.
    ///
    /// An earlier session for the same user is not cleaned up: its `token:`
    /// entry stays live until its own TTL lapses.
    pub async fn store(&self, username: &str, token: &str) -> Result<(), SessionError> {
        self.store
            .set_with_ttl(&session_key(username), token, self.ttl)
            .await?;
        self.store
            .set_with_ttl(&token_key(token), username, self.ttl)
            .await?;
        tracing::debug!(username = %username, "Session stored");
        Ok(())
    }

    pub async fn is_live(&self, token: &str) -> Result<bool, SessionError> {
        self.store.exists(&token_key(token)).await
    }

    pub async fn resolve_username(&self, token: &str) -> Result<Option<String>, SessionError> {
        self.store.get(&token_key(token)).await
    }

    /// Revoke the most recently stored session of `username`. No-op when the
    /// user has no session. Older concurrent sessions are left alone.
    pub async fn invalidate(&self, username: &str) -> Result<(), SessionError> {
        let session_key = session_key(username);
        let Some(token) = self.store.get(&session_key).await? else {
            tracing::debug!(username = %username, "No session to invalidate");
            return Ok(());
        };

        self.store.delete(&session_key).await?;
        self.store.delete(&token_key(&token)).await?;
        tracing::debug!(username = %username, "Session invalidated");
        Ok(())
    }

    /// Sliding expiration: reset both TTLs to the full lifetime.
    /// No-op when the token is not live.
    pub async fn extend(&self, token: &str) -> Result<(), SessionError> {
        let Some(username) = self.resolve_username(token).await? else {
            return Ok(());
        };

        self.store.expire(&session_key(&username), self.ttl).await?;
        self.store.expire(&token_key(token), self.ttl).await?;
        Ok(())
    }
}
