//! pixcache - tiered image cache
//!
//! Fetches remote images and serves them from a bounded in-memory tier of
//! decoded images or a size-budgeted on-disk tier of raw bytes, optionally
//! resized to fit a target box.
//!
//! ```no_run
//! # async fn demo() -> pixcache::Result<()> {
//! use pixcache::{CacheConfig, ImageCache, StorageLocation, TargetSize};
//!
//! let cache = ImageCache::new(CacheConfig::from_env())?;
//! let thumb = cache
//!     .fetch_image(
//!         "https://example.com/cat.png",
//!         &StorageLocation::disk(),
//!         Some(TargetSize::new(128, 128)),
//!     )
//!     .await?;
//! println!("{:?} from {:?}", thumb.dimensions(), thumb.origin);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod imaging;
pub mod key;

pub use cache::{EvictionPolicy, SizeBudget};
pub use config::CacheConfig;
pub use engine::{CacheStats, FetchedImage, ImageCache, Origin, PrefetchSummary, StorageLocation};
pub use error::{CacheError, Result};
pub use fetch::{FetchError, Fetcher, HttpFetcher};
pub use key::{CacheKey, TargetSize};
