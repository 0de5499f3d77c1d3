//! Prefetcher
//!
//! Warms a tier for a batch of locators. Each locator is checked and fetched
//! on its own task; one failure never stops the others.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use super::service::ImageCache;
use super::types::{PrefetchSummary, StorageLocation};
use crate::key::{parse_locator, TargetSize};

enum Prefetched {
    AlreadyCached,
    Fetched,
}

impl ImageCache {
    /// Warm the memory tier for every locator
    pub async fn prefetch<I, S>(&self, locators: I, size: Option<TargetSize>) -> PrefetchSummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.prefetch_into(locators, &StorageLocation::Memory, size)
            .await
    }

    /// Warm a tier for every locator
    ///
    /// Invalid locators and failed fetches are counted, not returned. Dropping
    /// the returned future aborts the outstanding fetches.
    pub async fn prefetch_into<I, S>(
        &self,
        locators: I,
        location: &StorageLocation,
        size: Option<TargetSize>,
    ) -> PrefetchSummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let limiter = self
            .config
            .prefetch_concurrency
            .map(|limit| Arc::new(Semaphore::new(limit)));

        let mut summary = PrefetchSummary::default();
        let mut tasks = JoinSet::new();

        for locator in locators {
            summary.requested += 1;
            let locator = locator.as_ref();

            let url = match parse_locator(locator) {
                Ok(url) => url,
                Err(e) => {
                    debug!(locator, error = %e, "Skipping invalid prefetch locator");
                    summary.failed += 1;
                    continue;
                }
            };

            let cache = self.clone();
            let location = location.clone();
            let limiter = limiter.clone();

            tasks.spawn(async move {
                // Held until the task finishes
                let _permit = match limiter {
                    Some(limiter) => Some(limiter.acquire_owned().await.ok()?),
                    None => None,
                };

                if cache.is_cached(&url, &location, size).await {
                    return Some(Prefetched::AlreadyCached);
                }

                match cache.request(&url, &location, size).await {
                    Ok(_) => Some(Prefetched::Fetched),
                    Err(e) => {
                        warn!(url = %url, error = %e, "Prefetch failed");
                        None
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(Prefetched::AlreadyCached)) => summary.already_cached += 1,
                Ok(Some(Prefetched::Fetched)) => summary.fetched += 1,
                Ok(None) => summary.failed += 1,
                Err(e) => {
                    warn!(error = %e, "Prefetch task failed");
                    summary.failed += 1;
                }
            }
        }

        info!(
            requested = summary.requested,
            already_cached = summary.already_cached,
            fetched = summary.fetched,
            failed = summary.failed,
            "Prefetch complete"
        );

        summary
    }

    /// Prefetch on a detached task that outlives the caller
    pub fn spawn_prefetch(
        &self,
        locators: Vec<String>,
        location: StorageLocation,
        size: Option<TargetSize>,
    ) -> JoinHandle<PrefetchSummary> {
        let cache = self.clone();
        tokio::spawn(async move { cache.prefetch_into(locators, &location, size).await })
    }
}
