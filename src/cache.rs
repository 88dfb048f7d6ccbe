//! Cache Store Module
//!
//! The cache store seam and the in-memory implementation backing a proxy
//! run. Values are opaque raw response bytes as received from the origin,
//! stored before any header rewriting.

use crate::cache_key::CacheKey;
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// External key-value store interface for cached responses.
///
/// The lookup/store pair around a miss is not atomic: two concurrent misses
/// for the same key may both fetch from the origin and both write. Last
/// write wins. Implementations provide per-operation atomicity only; the
/// proxy never assumes at-most-one-writer semantics.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the stored response for `key`, if present
    async fn lookup(&self, key: &CacheKey) -> Result<Option<Bytes>>;

    /// Store `response` under `key`, replacing any existing entry
    async fn store(&self, key: &CacheKey, response: Bytes) -> Result<()>;
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
}

/// In-memory cache store.
///
/// Unbounded and permanent for the life of the process; entries never
/// expire. Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, Bytes>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    stores: Arc<AtomicU64>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<Bytes>> {
        match self.entries.get(key.as_str()) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.value().clone()))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn store(&self, key: &CacheKey, response: Bytes) -> Result<()> {
        debug!("Caching {} response bytes", response.len());
        self.stores.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(key.as_str().to_string(), response);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(path: &str) -> CacheKey {
        CacheKey::for_get(path, "example.com")
    }

    #[tokio::test]
    async fn test_store_then_lookup() {
        let cache = MemoryCache::new();
        let k = key("/a");
        cache.store(&k, Bytes::from_static(b"resp")).await.unwrap();
        let got = cache.lookup(&k).await.unwrap();
        assert_eq!(got, Some(Bytes::from_static(b"resp")));
    }

    #[tokio::test]
    async fn test_lookup_absent_key() {
        let cache = MemoryCache::new();
        assert_eq!(cache.lookup(&key("/missing")).await.unwrap(), None);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[tokio::test]
    async fn test_store_replaces_existing_entry() {
        let cache = MemoryCache::new();
        let k = key("/a");
        cache.store(&k, Bytes::from_static(b"old")).await.unwrap();
        cache.store(&k, Bytes::from_static(b"new")).await.unwrap();
        assert_eq!(
            cache.lookup(&k).await.unwrap(),
            Some(Bytes::from_static(b"new"))
        );
        assert_eq!(cache.stats().entries, 1);
    }

    #[tokio::test]
    async fn test_stats_track_activity() {
        let cache = MemoryCache::new();
        let k = key("/a");
        cache.lookup(&k).await.unwrap();
        cache.store(&k, Bytes::from_static(b"r")).await.unwrap();
        cache.lookup(&k).await.unwrap();

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.stores, 1);
    }
}
