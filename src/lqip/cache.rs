//! Memo cache for reduction results.
//!
//! Maps an opaque string key to a previously computed placeholder. Entries
//! are evicted least-recently-used once the entry limit is reached, so the
//! cache cannot grow without bound over the process lifetime.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::RwLock;

use super::reducer::LqipImage;

/// Default maximum number of memoized placeholders.
pub const DEFAULT_LQIP_CACHE_ENTRIES: usize = 1024;

/// LRU cache of reduced images keyed by an opaque string.
///
/// The cache is thread-safe and can be shared across async tasks.
pub struct LqipCache {
    cache: RwLock<LruCache<String, Arc<LqipImage>>>,
    max_entries: NonZeroUsize,
}

impl LqipCache {
    /// Create a cache with the default entry limit.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LQIP_CACHE_ENTRIES)
    }

    /// Create a cache holding at most `max_entries` placeholders.
    ///
    /// A limit of zero is treated as one.
    pub fn with_capacity(max_entries: usize) -> Self {
        let max_entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::new(max_entries)),
            max_entries,
        }
    }

    /// Get a cached placeholder, marking it as recently used.
    pub async fn get(&self, key: &str) -> Option<Arc<LqipImage>> {
        let mut cache = self.cache.write().await;
        cache.get(key).cloned()
    }

    /// Check for a key without updating LRU order.
    pub async fn contains(&self, key: &str) -> bool {
        let cache = self.cache.read().await;
        cache.contains(key)
    }

    /// Store a placeholder, evicting the least-recently-used entry if full.
    pub async fn put(&self, key: impl Into<String>, image: Arc<LqipImage>) {
        let mut cache = self.cache.write().await;
        cache.put(key.into(), image);
    }

    /// Number of cached placeholders.
    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.len()
    }

    pub async fn is_empty(&self) -> bool {
        let cache = self.cache.read().await;
        cache.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.max_entries.get()
    }
}

impl Default for LqipCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
