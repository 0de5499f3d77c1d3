//! Memory Store
//!
//! Best-effort key → decoded image cache. A miss on a key that was previously
//! set is normal (the store evicts at its own discretion) and never an error.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use image::DynamicImage;
use lru::LruCache;
use moka::sync::Cache;
use tracing::{debug, trace};

use crate::key::CacheKey;

/// Decoded image shared between the cache and its callers
pub type SharedImage = Arc<DynamicImage>;

/// Default number of decoded images kept in memory
pub const DEFAULT_MEMORY_CAPACITY: u64 = 256;

/// In-memory tier. Implementations synchronize internally.
pub trait MemoryStore: Send + Sync {
    /// Look up a decoded image
    fn get(&self, key: &CacheKey) -> Option<SharedImage>;

    /// Store a decoded image, silently replacing any previous value
    fn set(&self, key: CacheKey, image: SharedImage);

    /// Drop a single entry
    fn remove(&self, key: &CacheKey);

    /// Drop every entry
    fn clear(&self);

    /// Number of entries currently held (may be approximate)
    fn entry_count(&self) -> u64;
}

/// Memory tier backed by Moka, bounded by entry count
///
/// Moka decides what to evict and when, so tests should not assume an entry
/// survives once capacity is reached.
pub struct MokaMemoryStore {
    images: Cache<CacheKey, SharedImage>,
}

impl MokaMemoryStore {
    /// Create a store holding at most `capacity` images
    pub fn new(capacity: u64) -> Self {
        let images = Cache::builder()
            .max_capacity(capacity)
            .name("decoded_image_cache")
            .build();

        Self { images }
    }
}

impl Default for MokaMemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

impl MemoryStore for MokaMemoryStore {
    fn get(&self, key: &CacheKey) -> Option<SharedImage> {
        let image = self.images.get(key);
        match image {
            Some(_) => trace!(key = %key, "Memory HIT"),
            None => trace!(key = %key, "Memory MISS"),
        }
        image
    }

    fn set(&self, key: CacheKey, image: SharedImage) {
        debug!(key = %key, width = image.width(), height = image.height(), "Cached decoded image");
        self.images.insert(key, image);
    }

    fn remove(&self, key: &CacheKey) {
        self.images.invalidate(key);
    }

    fn clear(&self) {
        self.images.invalidate_all();
        debug!("Cleared memory cache");
    }

    fn entry_count(&self) -> u64 {
        self.images.run_pending_tasks();
        self.images.entry_count()
    }
}

/// Memory tier with deterministic least-recently-used eviction
///
/// A capacity of zero stores nothing.
pub struct LruMemoryStore {
    images: Option<Mutex<LruCache<CacheKey, SharedImage>>>,
}

impl LruMemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            images: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    fn images(&self) -> Option<MutexGuard<'_, LruCache<CacheKey, SharedImage>>> {
        self.images
            .as_ref()
            .map(|images| images.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl MemoryStore for LruMemoryStore {
    fn get(&self, key: &CacheKey) -> Option<SharedImage> {
        let image = self.images().and_then(|mut images| images.get(key).cloned());
        match image {
            Some(_) => trace!(key = %key, "Memory HIT"),
            None => trace!(key = %key, "Memory MISS"),
        }
        image
    }

    fn set(&self, key: CacheKey, image: SharedImage) {
        let Some(mut images) = self.images() else {
            return;
        };
        if let Some((evicted, _)) = images.push(key.clone(), image) {
            if evicted != key {
                debug!(key = %evicted, "Evicted least recently used image");
            }
        }
    }

    fn remove(&self, key: &CacheKey) {
        if let Some(mut images) = self.images() {
            images.pop(key);
        }
    }

    fn clear(&self) {
        if let Some(mut images) = self.images() {
            images.clear();
        }
    }

    fn entry_count(&self) -> u64 {
        self.images().map_or(0, |images| images.len() as u64)
    }
}
