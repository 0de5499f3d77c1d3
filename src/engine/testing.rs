//! Test doubles for the engine

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use url::Url;

use crate::config::CacheConfig;
use crate::engine::ImageCache;
use crate::fetch::{FetchError, Fetcher};
use crate::cache::LruMemoryStore;

/// Fetcher serving canned responses and counting calls
#[derive(Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, Vec<u8>>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Option<Duration>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn serve(&self, url: &str, bytes: Vec<u8>) {
        self.responses
            .lock()
            .unwrap()
            .insert(Url::parse(url).unwrap().as_str().to_string(), bytes);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, locator: &Url) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = self.responses.lock().unwrap().get(locator.as_str()).cloned();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        response.ok_or_else(|| FetchError::NotFound(locator.to_string()))
    }
}

/// PNG bytes of a gradient so distinct pixels survive a round trip
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 7 % 256) as u8, (y * 13 % 256) as u8, 90, 255])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Engine over a mock fetcher and a deterministic memory tier
pub fn test_cache(config: CacheConfig) -> (ImageCache, Arc<MockFetcher>) {
    test_cache_with(config, MockFetcher::new())
}

pub fn test_cache_with(config: CacheConfig, fetcher: MockFetcher) -> (ImageCache, Arc<MockFetcher>) {
    let fetcher = Arc::new(fetcher);
    let memory = Arc::new(LruMemoryStore::new(64));
    let cache = ImageCache::with_collaborators(config, fetcher.clone(), memory);
    (cache, fetcher)
}

/// Config rooted in a temp directory
pub fn temp_config(dir: &std::path::Path) -> CacheConfig {
    CacheConfig {
        directory: dir.to_path_buf(),
        ..CacheConfig::default()
    }
}
