//! Opaque-session key-value store.
//!
//! Maps a proxy-minted session identifier to the serialized upstream
//! credential, bounded by a fixed TTL. The store is the sole source of truth
//! for whether a bridged session is live; the browser cookie is only a
//! capability token referencing it.

pub mod memory;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use redis::RedisStore;

/// The store itself is unreachable or misconfigured.
///
/// Callers map this to HTTP 500. It is never used for a plain miss, which is
/// the normal "no such session" signal.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// TTL-bounded identifier → credential mapping over a shared backing store.
///
/// Writes and deletes are scheduled by callers as detached tasks; a client
/// that logs in and immediately issues a second request may transiently see
/// "not authenticated" until the write propagates. That window is a
/// documented trade-off, not a bug.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Write a mapping with a fixed lifetime. Never extends an existing
    /// entry; re-login creates a brand-new identifier instead.
    async fn put(&self, session_id: &str, credential: &str, ttl: Duration)
        -> Result<(), StoreError>;

    /// Resolve an identifier. `Ok(None)` is a miss, not an error.
    async fn get(&self, session_id: &str) -> Result<Option<String>, StoreError>;

    /// Best-effort removal. Deleting an unknown identifier is a no-op.
    async fn delete(&self, session_id: &str) -> Result<(), StoreError>;
}
