//! Image Cache Engine
//!
//! Serves decoded images from the memory or disk tier, fetching over the
//! network on a miss. One engine instance serves both tiers; memory keys and
//! disk file names are derived independently and never mixed.
//!
//! Tier policies:
//! - Memory: the size is folded into the key, and the resized image is what
//!   gets cached, so each size occupies its own slot.
//! - Disk: file names ignore the size. The original bytes are stored and the
//!   image is resized on every read.
//!
//! At most one fetch per key is in flight: concurrent misses wait for the
//! first and then read what it stored. Dropping a request future cancels its
//! network fetch and releases the key; a disk write already handed to the
//! blocking pool runs to completion atomically.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, trace, warn};
use url::Url;

use super::inflight::InFlight;
use super::stats::{CacheCounters, CacheStats};
use super::types::{FetchedImage, Origin, StorageLocation};
use crate::cache::{DiskStore, FileRecord, MemoryStore, MokaMemoryStore, SharedImage, SizeBudget};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::fetch::{FetchError, Fetcher, HttpFetcher};
use crate::imaging::{resize_offloaded, Decoder, ImageCrateDecoder};
use crate::key::{derive_file_name, derive_key, parse_locator, CacheKey, TargetSize};

/// Caller-owned two-tier image cache
///
/// Cloning is cheap; clones share stores, collaborators and counters.
#[derive(Clone)]
pub struct ImageCache {
    /// Network collaborator
    fetcher: Arc<dyn Fetcher>,
    /// Bytes-to-image collaborator
    decoder: Arc<dyn Decoder>,
    /// Memory tier
    memory: Arc<dyn MemoryStore>,
    /// Disk stores opened so far, by directory
    disk_stores: Arc<Mutex<HashMap<PathBuf, Arc<DiskStore>>>>,
    /// Engine defaults
    pub(super) config: Arc<CacheConfig>,
    /// Hit/miss/eviction counters
    stats: Arc<CacheCounters>,
    /// Keys with a fetch in progress
    inflight: Arc<InFlight>,
}

impl ImageCache {
    /// Create an engine with the HTTP fetcher and a Moka memory tier
    pub fn new(config: CacheConfig) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(config.request_timeout)?);
        let memory = Arc::new(MokaMemoryStore::new(config.memory_capacity));

        info!(
            directory = %config.directory.display(),
            memory_capacity = config.memory_capacity,
            disk_budget = ?config.disk_budget.map(|b| b.to_string()),
            "Image cache initialized"
        );

        Ok(Self::with_collaborators(config, fetcher, memory))
    }

    /// Create an engine with caller-supplied fetcher and memory tier
    pub fn with_collaborators(
        config: CacheConfig,
        fetcher: Arc<dyn Fetcher>,
        memory: Arc<dyn MemoryStore>,
    ) -> Self {
        Self {
            fetcher,
            decoder: Arc::new(ImageCrateDecoder),
            memory,
            disk_stores: Arc::new(Mutex::new(HashMap::new())),
            config: Arc::new(config),
            stats: Arc::new(CacheCounters::default()),
            inflight: Arc::new(InFlight::default()),
        }
    }

    /// Replace the decode collaborator
    pub fn with_decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Fetch an image by locator string
    ///
    /// # Arguments
    /// * `locator` - Resource URL; empty or unparseable input fails with `InvalidLocator`
    /// * `location` - Tier to read from and populate
    /// * `size` - Fit the result inside these dimensions
    pub async fn fetch_image(
        &self,
        locator: &str,
        location: &StorageLocation,
        size: Option<TargetSize>,
    ) -> Result<FetchedImage> {
        let url = parse_locator(locator)?;
        self.request(&url, location, size).await
    }

    /// Fetch an image by parsed locator
    pub async fn request(
        &self,
        locator: &Url,
        location: &StorageLocation,
        size: Option<TargetSize>,
    ) -> Result<FetchedImage> {
        match location {
            StorageLocation::Memory => self.request_memory(locator, size).await,
            StorageLocation::Disk { directory, budget } => {
                let directory = self.resolve_directory(directory.as_deref());
                let budget = budget.or(self.config.disk_budget);
                self.request_disk(locator, directory, budget, size).await
            }
        }
    }

    async fn request_memory(&self, locator: &Url, size: Option<TargetSize>) -> Result<FetchedImage> {
        let key = derive_key(locator, size);

        if let Some(hit) = self.memory_hit(&key) {
            return Ok(hit);
        }
        let _inflight = self.inflight.acquire(&format!("memory:{key}")).await;
        if let Some(hit) = self.memory_hit(&key) {
            return Ok(hit);
        }
        self.stats.miss();

        let bytes = self.download(locator).await?;
        let decoded = self.decode(bytes).await;
        let image = match size {
            Some(size) => resize_offloaded(decoded, size).await.map(Arc::new),
            None => decoded,
        };

        match &image {
            Some(image) => self.memory.set(key.clone(), Arc::clone(image)),
            None => debug!(key = %key, "No image content to cache in memory"),
        }

        Ok(FetchedImage {
            key,
            image,
            file_path: None,
            origin: Origin::Network,
        })
    }

    fn memory_hit(&self, key: &CacheKey) -> Option<FetchedImage> {
        let image = self.memory.get(key)?;
        self.stats.memory_hit();
        trace!(key = %key, "Memory hit");
        Some(FetchedImage {
            key: key.clone(),
            image: Some(image),
            file_path: None,
            origin: Origin::Memory,
        })
    }

    async fn request_disk(
        &self,
        locator: &Url,
        directory: PathBuf,
        budget: Option<SizeBudget>,
        size: Option<TargetSize>,
    ) -> Result<FetchedImage> {
        let key = derive_key(locator, size);
        let file_name = derive_file_name(locator);
        let store = self.disk_store(&directory).await?;
        let mut file_path = Some(store.path_for(&file_name));

        let mut cached = self.read_cached(&store, &file_name, &key).await?;
        let inflight = if cached.is_none() {
            let guard = self
                .inflight
                .acquire(&format!("disk:{}", store.path_for(&file_name).display()))
                .await;
            cached = self.read_cached(&store, &file_name, &key).await?;
            Some(guard)
        } else {
            None
        };

        let (bytes, origin) = match cached {
            Some(bytes) => {
                self.stats.disk_hit();
                (bytes, Origin::Disk)
            }
            None => {
                self.stats.miss();
                let (bytes, evicted) = self
                    .fetch_and_store(locator, &store, &file_name, budget)
                    .await?;
                if evicted.iter().any(|r| r.file_name == file_name) {
                    debug!(key = %key, "Fetched file evicted on arrival");
                    file_path = None;
                }
                (bytes, Origin::Network)
            }
        };
        drop(inflight);

        let decoded = self.decode(bytes).await;
        let image = match size {
            Some(size) => resize_offloaded(decoded, size).await.map(Arc::new),
            None => decoded,
        };

        Ok(FetchedImage {
            key,
            image,
            file_path,
            origin,
        })
    }

    /// Read a disk artifact, treating a vanished or unreadable file as a miss
    async fn read_cached(
        &self,
        store: &Arc<DiskStore>,
        file_name: &str,
        key: &CacheKey,
    ) -> Result<Option<Vec<u8>>> {
        let store = Arc::clone(store);
        let name = file_name.to_string();
        let cached = run_blocking(move || {
            if store.exists(&name) {
                store.read(&name).map(Some)
            } else {
                Ok(None)
            }
        })
        .await;

        match cached {
            Ok(cached) => Ok(cached),
            // Eviction can delete a file between the existence check and the read
            Err(e) if e.is_cache_miss() => {
                warn!(key = %key, error = %e, "Cached file unreadable, refetching");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Download, write atomically, then enforce the budget
    ///
    /// # Returns
    /// The downloaded bytes and any files evicted
    async fn fetch_and_store(
        &self,
        locator: &Url,
        store: &Arc<DiskStore>,
        file_name: &str,
        budget: Option<SizeBudget>,
    ) -> Result<(Vec<u8>, Vec<FileRecord>)> {
        let bytes = self.download(locator).await?;

        let policy = self.config.eviction_policy;
        let store = Arc::clone(store);
        let name = file_name.to_string();
        let (bytes, evicted) = run_blocking(move || {
            store.write(&name, &bytes)?;
            let evicted = match budget {
                Some(budget) => store.enforce_budget(budget, policy),
                None => Vec::new(),
            };
            Ok((bytes, evicted))
        })
        .await?;

        if !evicted.is_empty() {
            self.stats.evicted(evicted.len());
        }
        Ok((bytes, evicted))
    }

    async fn download(&self, locator: &Url) -> std::result::Result<Vec<u8>, FetchError> {
        match self.fetcher.fetch(locator).await {
            Ok(bytes) => {
                self.stats.network_fetch();
                Ok(bytes)
            }
            Err(e) => {
                self.stats.fetch_failure();
                warn!(url = %locator, error = %e, "Fetch failed");
                Err(e)
            }
        }
    }

    /// Decode on the blocking pool; failures become an absent image
    async fn decode(&self, bytes: Vec<u8>) -> Option<SharedImage> {
        let decoder = Arc::clone(&self.decoder);
        match tokio::task::spawn_blocking(move || decoder.decode(&bytes)).await {
            Ok(image) => image.map(Arc::new),
            Err(e) => {
                warn!(error = %e, "Decode task failed");
                None
            }
        }
    }

    /// Whether a locator's artifact is present in the given tier
    pub async fn is_cached(&self, locator: &Url, location: &StorageLocation, size: Option<TargetSize>) -> bool {
        match location {
            StorageLocation::Memory => self.memory.get(&derive_key(locator, size)).is_some(),
            StorageLocation::Disk { directory, .. } => {
                let directory = self.resolve_directory(directory.as_deref());
                let store = match self.disk_store(&directory).await {
                    Ok(store) => store,
                    Err(_) => return false,
                };
                let file_name = derive_file_name(locator);
                run_blocking(move || Ok(store.exists(&file_name)))
                    .await
                    .unwrap_or(false)
            }
        }
    }

    /// Remove a locator's artifact from the given tier
    pub async fn invalidate(
        &self,
        locator: &str,
        location: &StorageLocation,
        size: Option<TargetSize>,
    ) -> Result<()> {
        let url = parse_locator(locator)?;
        match location {
            StorageLocation::Memory => {
                let key = derive_key(&url, size);
                self.memory.remove(&key);
                debug!(key = %key, "Invalidated memory entry");
                Ok(())
            }
            StorageLocation::Disk { directory, .. } => {
                let directory = self.resolve_directory(directory.as_deref());
                let store = self.disk_store(&directory).await?;
                let file_name = derive_file_name(&url);
                run_blocking(move || store.remove(&file_name)).await
            }
        }
    }

    /// Look up a decoded image in the memory tier without fetching
    pub fn cached_image(&self, key: &CacheKey) -> Option<SharedImage> {
        self.memory.get(key)
    }

    /// Empty the memory tier
    pub fn clear_memory(&self) {
        self.memory.clear();
    }

    /// Snapshot of the engine counters
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Log current cache metrics
    pub fn log_metrics(&self) {
        let stats = self.stats();
        info!(
            memory_hits = stats.memory_hits,
            disk_hits = stats.disk_hits,
            misses = stats.misses,
            network_fetches = stats.network_fetches,
            fetch_failures = stats.fetch_failures,
            evictions = stats.evictions,
            memory_entries = self.memory.entry_count(),
            hit_rate = %format!("{:.1}%", stats.hit_rate()),
            "Cache metrics"
        );
    }

    fn resolve_directory(&self, directory: Option<&Path>) -> PathBuf {
        directory
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.directory.clone())
    }

    /// Disk store for a directory, opened once per engine
    async fn disk_store(&self, directory: &Path) -> Result<Arc<DiskStore>> {
        let opened = self.stores().get(directory).cloned();
        if let Some(store) = opened {
            return Ok(store);
        }

        let dir = directory.to_path_buf();
        let store = Arc::new(run_blocking(move || DiskStore::open(dir)).await?);

        let mut stores = self.stores();
        let store = stores
            .entry(directory.to_path_buf())
            .or_insert(store);
        Ok(Arc::clone(store))
    }

    fn stores(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Arc<DiskStore>>> {
        self.disk_stores.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Run blocking disk work off the async workers
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{png_bytes, temp_config, test_cache, test_cache_with, MockFetcher};
    use crate::error::CacheError;
    use crate::key::FILE_NAME_PREFIX;
    use image::DynamicImage;
    use tempfile::tempdir;

    fn pixel_bytes(image: &DynamicImage) -> &[u8] {
        image.as_bytes()
    }

    const CAT: &str = "https://example.com/cat.png";
    const DOG: &str = "https://example.com/dog.png";

    #[tokio::test]
    async fn test_empty_locator_is_invalid() {
        let dir = tempdir().unwrap();
        let (cache, fetcher) = test_cache(temp_config(dir.path()));

        let err = cache
            .fetch_image("", &StorageLocation::Memory, None)
            .await
            .unwrap_err();

        assert!(matches!(err, CacheError::InvalidLocator(_)));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_memory_second_request_hits_cache() {
        let dir = tempdir().unwrap();
        let (cache, fetcher) = test_cache(temp_config(dir.path()));
        fetcher.serve(CAT, png_bytes(32, 16));

        let first = cache.fetch_image(CAT, &StorageLocation::Memory, None).await.unwrap();
        let second = cache.fetch_image(CAT, &StorageLocation::Memory, None).await.unwrap();

        assert_eq!(first.origin, Origin::Network);
        assert_eq!(second.origin, Origin::Memory);
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(
            pixel_bytes(first.image.as_ref().unwrap()),
            pixel_bytes(second.image.as_ref().unwrap())
        );
        assert!(second.file_path.is_none());
    }

    #[tokio::test]
    async fn test_memory_sizes_occupy_separate_slots() {
        let dir = tempdir().unwrap();
        let (cache, fetcher) = test_cache(temp_config(dir.path()));
        fetcher.serve(CAT, png_bytes(200, 100));

        let small = Some(TargetSize::new(20, 20));
        let large = Some(TargetSize::new(100, 100));

        let a = cache.fetch_image(CAT, &StorageLocation::Memory, small).await.unwrap();
        let b = cache.fetch_image(CAT, &StorageLocation::Memory, large).await.unwrap();
        let c = cache.fetch_image(CAT, &StorageLocation::Memory, small).await.unwrap();

        assert_eq!(a.dimensions(), Some((20, 10)));
        assert_eq!(b.dimensions(), Some((100, 50)));
        assert_eq!(c.dimensions(), Some((20, 10)));
        assert_eq!(c.origin, Origin::Memory);
        assert_ne!(a.key, b.key);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_disk_second_request_reads_file() {
        let dir = tempdir().unwrap();
        let (cache, fetcher) = test_cache(temp_config(dir.path()));
        let bytes = png_bytes(24, 24);
        fetcher.serve(CAT, bytes.clone());

        let first = cache.fetch_image(CAT, &StorageLocation::disk(), None).await.unwrap();
        let second = cache.fetch_image(CAT, &StorageLocation::disk(), None).await.unwrap();

        assert_eq!(first.origin, Origin::Network);
        assert_eq!(second.origin, Origin::Disk);
        assert_eq!(fetcher.calls(), 1);

        let path = second.file_path.clone().unwrap();
        assert!(path.starts_with(dir.path()));
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(FILE_NAME_PREFIX));
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
        assert_eq!(
            pixel_bytes(first.image.as_ref().unwrap()),
            pixel_bytes(second.image.as_ref().unwrap())
        );
    }

    #[tokio::test]
    async fn test_disk_stores_original_and_resizes_on_read() {
        let dir = tempdir().unwrap();
        let (cache, fetcher) = test_cache(temp_config(dir.path()));
        let bytes = png_bytes(120, 60);
        fetcher.serve(CAT, bytes.clone());

        let location = StorageLocation::disk_in(dir.path().join("thumbs"));
        let small = cache
            .fetch_image(CAT, &location, Some(TargetSize::new(30, 30)))
            .await
            .unwrap();
        let full = cache.fetch_image(CAT, &location, None).await.unwrap();

        assert_eq!(small.dimensions(), Some((30, 15)));
        assert_eq!(full.dimensions(), Some((120, 60)));
        assert_eq!(full.origin, Origin::Disk);
        assert_eq!(std::fs::read(full.file_path.unwrap()).unwrap(), bytes);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_caches_nothing_and_is_retryable() {
        let dir = tempdir().unwrap();
        let (cache, fetcher) = test_cache(temp_config(dir.path()));

        let err = cache
            .fetch_image(CAT, &StorageLocation::disk(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Fetch(FetchError::NotFound(_))));
        assert!(!cache
            .is_cached(&Url::parse(CAT).unwrap(), &StorageLocation::disk(), None)
            .await);

        let err = cache
            .fetch_image(CAT, &StorageLocation::Memory, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Fetch(_)));
        assert_eq!(cache.stats().fetch_failures, 2);

        fetcher.serve(CAT, png_bytes(4, 4));
        let ok = cache.fetch_image(CAT, &StorageLocation::Memory, None).await.unwrap();
        assert_eq!(ok.origin, Origin::Network);
    }

    #[tokio::test]
    async fn test_failed_request_leaves_prior_content() {
        let dir = tempdir().unwrap();
        let (cache, fetcher) = test_cache(temp_config(dir.path()));
        fetcher.serve(CAT, png_bytes(8, 8));

        cache.fetch_image(CAT, &StorageLocation::disk(), None).await.unwrap();
        assert!(cache.fetch_image(DOG, &StorageLocation::disk(), None).await.is_err());

        let again = cache.fetch_image(CAT, &StorageLocation::disk(), None).await.unwrap();
        assert_eq!(again.origin, Origin::Disk);
        assert_eq!(again.dimensions(), Some((8, 8)));
    }

    #[tokio::test]
    async fn test_non_image_payload_is_fail_soft() {
        let dir = tempdir().unwrap();
        let (cache, fetcher) = test_cache(temp_config(dir.path()));
        fetcher.serve(CAT, b"<html>oops</html>".to_vec());

        let memory = cache.fetch_image(CAT, &StorageLocation::Memory, None).await.unwrap();
        assert!(memory.image.is_none());
        assert!(cache.cached_image(&memory.key).is_none());

        let disk = cache.fetch_image(CAT, &StorageLocation::disk(), None).await.unwrap();
        assert!(disk.image.is_none());
        assert!(disk.file_path.unwrap().exists());

        let sized = cache
            .fetch_image(CAT, &StorageLocation::disk(), Some(TargetSize::new(5, 5)))
            .await
            .unwrap();
        assert!(sized.image.is_none());
        assert_eq!(sized.origin, Origin::Disk);
    }

    #[tokio::test]
    async fn test_disk_budget_evicts_first_written() {
        let dir = tempdir().unwrap();
        let (cache, fetcher) = test_cache(temp_config(dir.path()));
        let location = StorageLocation::disk().with_budget(SizeBudget::from_kilobytes(1));
        let urls = [
            "https://example.com/1",
            "https://example.com/2",
            "https://example.com/3",
        ];
        for url in &urls {
            fetcher.serve(url, vec![0u8; 500]);
        }

        let mut paths = Vec::new();
        for url in &urls {
            let fetched = cache.fetch_image(url, &location, None).await.unwrap();
            paths.push(fetched.file_path.unwrap());
            tokio::time::sleep(std::time::Duration::from_millis(15)).await;
        }

        assert!(!paths[0].exists());
        assert!(paths[1].exists());
        assert!(paths[2].exists());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn test_file_evicted_on_arrival_has_no_path() {
        let dir = tempdir().unwrap();
        let (cache, fetcher) = test_cache(temp_config(dir.path()));
        fetcher.serve(CAT, png_bytes(16, 16));

        let location = StorageLocation::disk().with_budget(SizeBudget::from_bytes(10));
        let fetched = cache.fetch_image(CAT, &location, None).await.unwrap();

        assert!(fetched.file_path.is_none());
        assert_eq!(fetched.dimensions(), Some((16, 16)));
    }

    #[tokio::test]
    async fn test_invalidate_removes_from_each_tier() {
        let dir = tempdir().unwrap();
        let (cache, fetcher) = test_cache(temp_config(dir.path()));
        fetcher.serve(CAT, png_bytes(4, 4));

        cache.fetch_image(CAT, &StorageLocation::Memory, None).await.unwrap();
        cache.fetch_image(CAT, &StorageLocation::disk(), None).await.unwrap();

        cache.invalidate(CAT, &StorageLocation::Memory, None).await.unwrap();
        cache.invalidate(CAT, &StorageLocation::disk(), None).await.unwrap();

        let url = Url::parse(CAT).unwrap();
        assert!(!cache.is_cached(&url, &StorageLocation::Memory, None).await);
        assert!(!cache.is_cached(&url, &StorageLocation::disk(), None).await);
    }

    #[tokio::test]
    async fn test_tiers_do_not_cross_contaminate() {
        let dir = tempdir().unwrap();
        let (cache, fetcher) = test_cache(temp_config(dir.path()));
        fetcher.serve(CAT, png_bytes(4, 4));

        cache.fetch_image(CAT, &StorageLocation::Memory, None).await.unwrap();
        let disk = cache.fetch_image(CAT, &StorageLocation::disk(), None).await.unwrap();

        assert_eq!(disk.origin, Origin::Network);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_for_same_key() {
        let dir = tempdir().unwrap();
        let (cache, fetcher) = test_cache(temp_config(dir.path()));
        let bytes = png_bytes(64, 64);
        fetcher.serve(CAT, bytes.clone());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    let location = if i % 2 == 0 {
                        StorageLocation::disk()
                    } else {
                        StorageLocation::Memory
                    };
                    cache.fetch_image(CAT, &location, None).await
                })
            })
            .collect();

        for handle in handles {
            let fetched = handle.await.unwrap().unwrap();
            assert_eq!(fetched.dimensions(), Some((64, 64)));
        }

        // One fetch per tier; the other requests wait and hit
        assert_eq!(fetcher.calls(), 2);
        let path = dir.path().join(derive_file_name(&Url::parse(CAT).unwrap()));
        assert_eq!(std::fs::read(path).unwrap(), bytes);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_share_one_fetch() {
        let dir = tempdir().unwrap();
        let (cache, fetcher) = test_cache_with(
            temp_config(dir.path()),
            MockFetcher::with_delay(std::time::Duration::from_millis(30)),
        );
        fetcher.serve(DOG, png_bytes(10, 10));

        let requests = (0..5).map(|_| cache.fetch_image(DOG, &StorageLocation::Memory, None));
        let results = futures::future::join_all(requests).await;

        let network = results
            .iter()
            .filter(|r| r.as_ref().unwrap().origin == Origin::Network)
            .count();
        assert_eq!(network, 1);
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(fetcher.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_stats_track_hits_and_misses() {
        let dir = tempdir().unwrap();
        let (cache, fetcher) = test_cache(temp_config(dir.path()));
        fetcher.serve(CAT, png_bytes(4, 4));

        cache.fetch_image(CAT, &StorageLocation::Memory, None).await.unwrap();
        cache.fetch_image(CAT, &StorageLocation::Memory, None).await.unwrap();
        cache.fetch_image(CAT, &StorageLocation::disk(), None).await.unwrap();
        cache.fetch_image(CAT, &StorageLocation::disk(), None).await.unwrap();

        let stats = cache.stats();
        assert_eq!(stats.memory_hits, 1);
        assert_eq!(stats.disk_hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.network_fetches, 2);
        cache.log_metrics();
    }
}
