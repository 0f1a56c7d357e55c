//! `QueryCache` capability: keyed cache for query results with per-handler
//! TTL. Backend is either an in-process map or an external shared cache;
//! the bus contract never sees which (per the Design Notes' "Cache backend
//! variants" re-architecture).

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

/// A cached value is stored type-erased since the bus caches results across
/// many distinct `Query::Result` types; callers downcast after `get`.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

#[async_trait]
pub trait QueryCache: Send + Sync {
    /// Fetch a live (non-expired) entry, if any.
    async fn get(&self, key: &str) -> Option<CachedValue>;

    /// Store a value with the given TTL. Overwrites any existing entry.
    /// Negative results (errors) must never be stored here — the query bus
    /// only calls `put` after a successful handler execution.
    async fn put(&self, key: String, value: CachedValue, ttl: Duration);

    /// Remove an entry regardless of expiry.
    async fn evict(&self, key: &str);
}

struct Entry {
    value: CachedValue,
    expires_at: Instant,
}

/// In-process map-backed cache. TTL is honored to within one `get`/`put`
/// call (lazy expiry, no background sweeper).
#[derive(Default)]
pub struct InProcessCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InProcessCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueryCache for InProcessCache {
    async fn get(&self, key: &str) -> Option<CachedValue> {
        let now = Instant::now();
        let hit = {
            let entries = self.entries.read().await;
            entries.get(key).filter(|e| e.expires_at > now).map(|e| e.value.clone())
        };
        if hit.is_none() {
            // Lazily evict an expired entry found on the read path.
            let mut entries = self.entries.write().await;
            if let Some(entry) = entries.get(key) {
                if entry.expires_at <= now {
                    entries.remove(key);
                }
            }
        }
        hit
    }

    async fn put(&self, key: String, value: CachedValue, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.insert(key, Entry { value, expires_at: Instant::now() + ttl });
    }

    async fn evict(&self, key: &str) {
        self.entries.write().await.remove(key);
    }
}
