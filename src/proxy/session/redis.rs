//! Redis-backed session store for shared deployments.
//!
//! Three commands cover the whole contract: `SET .. EX` for TTL-bounded
//! writes, `GET` for resolution, `DEL` for invalidation. Expiry is enforced
//! by the store itself, so a vanished key is indistinguishable from an
//! explicit delete — which is exactly the semantics the handlers want.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::{SessionStore, StoreError};

pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to the shared store. The connection manager reconnects on its
    /// own; individual command failures surface as `StoreError::Unavailable`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)
            .map_err(|e| StoreError::Unavailable(format!("invalid redis url: {}", e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Unavailable(format!("redis connect failed: {}", e)))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn put(
        &self,
        session_id: &str,
        credential: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(session_id)
            .arg(credential)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn get(&self, session_id: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("GET")
            .arg(session_id)
            .query_async::<Option<String>>(&mut conn)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(session_id)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}
