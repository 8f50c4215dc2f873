use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::scheduler::{EvictionScheduler, TokioScheduler};
use crate::cache::store::CacheStore;
use crate::error::CacheError;
use crate::helpers::time::Clock;

type Entries = Arc<RwLock<HashMap<String, CacheEntry>>>;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    /// absolute expiry in ms, `None` never expires
    expiry: Option<i64>,
    /// identifies the `set` that created the entry, so a late eviction
    /// never removes a newer value stored under the same key
    generation: u64,
}

impl CacheEntry {
    fn is_expired(&self, now_ms: i64) -> bool {
        self.expiry.is_some_and(|expiry| now_ms > expiry)
    }
}

/// In-process cache store: expiry checked on every read, plus a scheduled
/// eviction per TTL entry.
#[derive(Clone)]
pub struct MemoryCache {
    inner: Entries,
    generation: Arc<AtomicU64>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn EvictionScheduler>,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>, scheduler: Arc<dyn EvictionScheduler>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
            clock,
            scheduler,
        }
    }

    pub fn with_tokio_scheduler(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, Arc::new(TokioScheduler::new()))
    }

    /// Entries currently held, including expired ones not yet read or evicted.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn remove_expired(&self, key: &str, now_ms: i64) {
        let mut map = self.inner.write().await;
        // re-check under the write lock, a concurrent set may have replaced it
        if map.get(key).is_some_and(|entry| entry.is_expired(now_ms)) {
            map.remove(key);
            self.scheduler.cancel(key);
            debug!("cache entry '{}' expired on read", key);
        }
    }
}

impl CacheStore for MemoryCache {
    async fn get<T>(&self, key: &str) -> Result<Option<T>, CacheError>
    where
        T: DeserializeOwned + Send,
    {
        let now = self.clock.now_ms();
        let value = {
            let map = self.inner.read().await;
            match map.get(key) {
                None => return Ok(None),
                Some(entry) if entry.is_expired(now) => None,
                Some(entry) => Some(entry.value.clone()),
            }
        };

        let Some(value) = value else {
            self.remove_expired(key, now).await;
            return Ok(None);
        };

        serde_json::from_value(value)
            .map(Some)
            .map_err(|source| CacheError::Decode { key: key.to_owned(), source })
    }

    async fn set<T>(&self, key: &str, value: &T, ttl_seconds: Option<u64>) -> Result<(), CacheError>
    where
        T: Serialize + Sync,
    {
        let value = serde_json::to_value(value)
            .map_err(|source| CacheError::Encode { key: key.to_owned(), source })?;
        let ttl_seconds = ttl_seconds.filter(|ttl| *ttl > 0);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let expiry = ttl_seconds.map(|ttl| {
            let ttl_ms = i64::try_from(ttl).ok().and_then(|ttl| ttl.checked_mul(1000));
            self.clock.now_ms().saturating_add(ttl_ms.unwrap_or(i64::MAX))
        });

        let mut map = self.inner.write().await;
        map.insert(key.to_owned(), CacheEntry { value, expiry, generation });

        // scheduling under the write lock keeps entry and timer in step
        match ttl_seconds {
            Some(ttl) => {
                let entries = self.inner.clone();
                let owned_key = key.to_owned();
                self.scheduler.schedule(
                    key,
                    Duration::from_secs(ttl),
                    Box::pin(evict(entries, owned_key, generation)),
                );
            }
            None => self.scheduler.cancel(key),
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut map = self.inner.write().await;
        map.remove(key);
        self.scheduler.cancel(key);
        Ok(())
    }
}

async fn evict(entries: Entries, key: String, generation: u64) {
    let mut map = entries.write().await;
    if map.get(&key).is_some_and(|entry| entry.generation == generation) {
        map.remove(&key);
        debug!("cache entry '{}' evicted after ttl", key);
    }
}
