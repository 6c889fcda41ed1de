//! Directory listing cache.
//!
//! Provides LRU caching of directory listings. Structural changes invalidate
//! entries; invalidation is best-effort and never a correctness mechanism,
//! so readers may observe a stale listing until the store mutation lands.

use crate::config::ListingCacheConfig;
use crate::types::{Entry, FullPath};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Capability to drop cached state for a directory.
pub trait DirectoryCache: Send + Sync {
    fn invalidate(&self, dir: &FullPath);
}

/// Cache statistics.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Total number of cache hits.
    pub hits: u64,
    /// Total number of cache misses.
    pub misses: u64,
    /// Total number of invalidation calls.
    pub invalidations: u64,
    /// Current number of cached directories.
    pub entries: usize,
}

impl CacheStats {
    /// Calculate hit ratio.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

#[derive(Clone)]
struct CachedListing {
    entries: Arc<Vec<Entry>>,
    cached_at: Instant,
}

impl CachedListing {
    fn age(&self) -> Duration {
        self.cached_at.elapsed()
    }
}

/// LRU cache of directory path to its listing.
pub struct ListingCache {
    cache: Mutex<LruCache<FullPath, CachedListing>>,
    max_age: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl ListingCache {
    /// Create a new listing cache.
    pub fn new(config: &ListingCacheConfig) -> Self {
        let max_entries = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);

        Self {
            cache: Mutex::new(LruCache::new(max_entries)),
            max_age: config.max_age,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Get the cached listing of `dir`.
    pub fn get(&self, dir: &FullPath) -> Option<Arc<Vec<Entry>>> {
        let mut cache = self.cache.lock();

        let cached = cache
            .get(dir)
            .map(|listing| (listing.age() <= self.max_age, Arc::clone(&listing.entries)));

        let hit = match cached {
            Some((true, entries)) => Some(entries),
            Some((false, _)) => {
                cache.pop(dir);
                None
            }
            None => None,
        };

        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    /// Cache the listing of `dir`.
    pub fn put(&self, dir: FullPath, entries: Vec<Entry>) {
        let listing = CachedListing {
            entries: Arc::new(entries),
            cached_at: Instant::now(),
        };
        self.cache.lock().put(dir, listing);
    }

    pub fn contains(&self, dir: &FullPath) -> bool {
        self.cache.lock().contains(dir)
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl Default for ListingCache {
    fn default() -> Self {
        Self::new(&ListingCacheConfig::default())
    }
}

impl DirectoryCache for ListingCache {
    /// Drops the listing of `dir` and of its parent, which lists `dir` itself.
    fn invalidate(&self, dir: &FullPath) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        crate::observability::record_cache_invalidation();

        let mut cache = self.cache.lock();
        cache.pop(dir);
        if let Some(parent) = dir.parent() {
            cache.pop(&parent);
        }
    }
}

/// Cache that holds nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDirectoryCache;

impl DirectoryCache for NoopDirectoryCache {
    fn invalidate(&self, _dir: &FullPath) {}
}
