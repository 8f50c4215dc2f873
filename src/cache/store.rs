use std::future::Future;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::CacheError;

/// Key-value store with optional per-entry TTL.
///
/// `ttl_seconds` of `None` or `Some(0)` means the entry never expires.
/// Reads must report expired entries as absent even if proactive eviction
/// has not run yet.
pub trait CacheStore: Send + Sync {
    fn get<T>(&self, key: &str) -> impl Future<Output = Result<Option<T>, CacheError>> + Send
    where
        T: DeserializeOwned + Send;

    fn set<T>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: Option<u64>,
    ) -> impl Future<Output = Result<(), CacheError>> + Send
    where
        T: Serialize + Sync;

    /// Idempotent; also cancels any pending eviction for `key`.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), CacheError>> + Send;
}
