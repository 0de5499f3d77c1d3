//! Fetch engine and prefetcher

mod inflight;
mod prefetch;
mod service;
mod stats;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use service::ImageCache;
pub use stats::CacheStats;
pub use types::{FetchedImage, Origin, PrefetchSummary, StorageLocation};
