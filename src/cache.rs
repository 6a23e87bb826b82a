use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::types::Result;

/// Every key is namespaced before it reaches the backing store, so
/// prefix invalidation can never touch another application's entries.
const NAMESPACE: &str = "news_aggregator";

/// Outcome of a prefix invalidation on the underlying store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixDelete {
    Deleted(usize),
    /// The backend cannot enumerate keys by prefix; the gateway degrades
    /// to a full flush.
    Unsupported,
}

/// Generic key-value backend behind the cache gateway.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    async fn set(&self, key: &str, value: Value, ttl: Duration);
    async fn delete(&self, key: &str) -> bool;
    async fn delete_by_prefix(&self, prefix: &str) -> PrefixDelete;
    async fn flush(&self);
}

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// In-process cache backend; entries expire lazily on read.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Option<Value> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: drop the entry so the map does not grow unbounded.
        self.entries.write().await.remove(key);
        None
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
    }

    async fn delete(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    async fn delete_by_prefix(&self, prefix: &str) -> PrefixDelete {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        PrefixDelete::Deleted(before - entries.len())
    }

    async fn flush(&self) {
        self.entries.write().await.clear();
    }
}

/// Read-through cache over a [`CacheStore`], with the application
/// namespace and the per-category TTL policy applied to every key.
pub struct CacheGateway {
    store: Arc<dyn CacheStore>,
}

impl CacheGateway {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheStore::new()))
    }

    fn namespaced(key: &str) -> String {
        format!("{NAMESPACE}:{key}")
    }

    /// TTL table, keyed by the logical key's leading segment. Unrecognized
    /// prefixes get the short `articles` lifetime.
    fn ttl_for(key: &str) -> Duration {
        let minutes = match key.split(':').next().unwrap_or_default() {
            "categories" => 60 * 24,
            "sources" => 60 * 24,
            "authors" => 60 * 12,
            "filter_options" => 60 * 6,
            "articles" => 5,
            "personalized_feed" => 5,
            _ => 5,
        };

        Duration::from_secs(minutes * 60)
    }

    /// Returns the cached value for `key`, or computes, stores and returns
    /// it. Callers cannot distinguish a hit from a miss.
    pub async fn remember<T, F, Fut>(&self, key: &str, ttl: Option<Duration>, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let cache_key = Self::namespaced(key);

        if let Some(value) = self.store.get(&cache_key).await {
            if let Ok(hit) = serde_json::from_value(value) {
                debug!(key, "cache hit");
                return Ok(hit);
            }
            // A value that no longer deserializes is treated as a miss.
        }

        let computed = compute().await?;
        let value = serde_json::to_value(&computed)?;
        let ttl = ttl.unwrap_or_else(|| Self::ttl_for(key));
        self.store.set(&cache_key, value, ttl).await;

        Ok(computed)
    }

    pub async fn forget(&self, key: &str) -> bool {
        self.store.delete(&Self::namespaced(key)).await
    }

    /// Invalidates every entry under a logical prefix. Backends without
    /// prefix enumeration fall back to a full flush: staleness is worse
    /// than a cold cache.
    pub async fn forget_by_prefix(&self, prefix: &str) {
        let namespaced = Self::namespaced(prefix);

        match self.store.delete_by_prefix(&namespaced).await {
            PrefixDelete::Deleted(removed) => {
                debug!(prefix, removed, "invalidated cache prefix");
            }
            PrefixDelete::Unsupported => {
                warn!(prefix, "cache backend cannot delete by prefix, flushing everything");
                self.store.flush().await;
            }
        }
    }
}
