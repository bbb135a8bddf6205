//! In-memory report cache using moka
//!
//! An injected cache instance with explicit creation and teardown; nothing
//! here is module-level global state, so tests supply a fresh instance per
//! run.

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// In-memory TTL cache for derived values, keyed by context id
#[derive(Debug, Clone)]
pub struct ReportCache<T: Send + Sync + 'static> {
    inner: Cache<String, Arc<T>>,
}

impl<T: Send + Sync + 'static> ReportCache<T> {
    /// Create a cache with max capacity and time-to-live
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Insert a value under `key`
    pub async fn insert(&self, key: impl Into<String>, value: T) {
        self.inner.insert(key.into(), Arc::new(value)).await;
    }

    /// Get the value under `key`, if present and unexpired
    #[must_use]
    pub async fn get(&self, key: &str) -> Option<Arc<T>> {
        self.inner.get(key).await
    }

    /// Drop the value under `key`
    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    /// Number of live entries
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_then_get() {
        let cache: ReportCache<String> = ReportCache::new(16, Duration::from_secs(60));
        cache.insert("k", "v".to_string()).await;
        assert_eq!(cache.get("k").await.as_deref(), Some(&"v".to_string()));
    }

    #[tokio::test]
    async fn invalidate_removes_entry() {
        let cache: ReportCache<u32> = ReportCache::new(16, Duration::from_secs(60));
        cache.insert("k", 7).await;
        cache.invalidate("k").await;
        assert!(cache.get("k").await.is_none());
    }
}
