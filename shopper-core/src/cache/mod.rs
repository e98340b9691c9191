use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::common::error::CacheError;

/// Key-value contract for aggregation results.
///
/// Absence on `get` covers both "never set" and "expired" — once an entry's
/// TTL has elapsed it must be indistinguishable from absent. The backing
/// store may be in-process or external; the aggregator depends only on this
/// trait and treats any `CacheError` as a miss.
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;
    async fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

/// In-process `ResultCache` backed by a mutex-guarded map.
///
/// Expired entries are evicted lazily on lookup; `purge_expired` offers a
/// proactive sweep for long-running processes. Writes are last-writer-wins,
/// which is the promised behavior for concurrent aggregations of one key.
#[derive(Debug, Clone)]
pub struct InMemoryCache {
    inner: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Drop every entry whose TTL has elapsed. Returns the number evicted.
    pub async fn purge_expired(&self) -> usize {
        let mut map = self.inner.lock().await;
        let before = map.len();
        let now = Instant::now();
        map.retain(|_, entry| entry.expires_at > now);
        before - map.len()
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let mut map = self.inner.lock().await;
        match map.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                // Lazy eviction: expired entries are removed on first touch.
                debug!(key, "cache entry expired, evicting");
                map.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.inner.lock().await.insert(key.to_string(), entry);
        Ok(())
    }
}
