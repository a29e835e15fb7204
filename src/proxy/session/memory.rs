//! In-memory session store for local development and tests.
//!
//! Not shared across processes and lost on restart; deployments point
//! `FEEDBRIDGE_REDIS_URL` at the shared store instead.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{SessionStore, StoreError};

pub struct MemoryStore {
    /// session id -> (credential, expiry deadline)
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Drop entries past their deadline.
    pub async fn cleanup_expired(&self) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, deadline)| *deadline > now);
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn put(
        &self,
        session_id: &str,
        credential: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let deadline = Instant::now() + ttl;
        let mut entries = self.entries.write().await;
        entries.insert(session_id.to_string(), (credential.to_string(), deadline));
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<String>, StoreError> {
        {
            let entries = self.entries.read().await;
            match entries.get(session_id) {
                Some((credential, deadline)) if *deadline > Instant::now() => {
                    return Ok(Some(credential.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired entry: remove it and report a miss
        let mut entries = self.entries.write().await;
        entries.remove(session_id);
        Ok(None)
    }

    async fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.remove(session_id);
        Ok(())
    }
}
