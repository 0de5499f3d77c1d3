//! Engine request and result types

use std::path::PathBuf;

use serde::Serialize;

use crate::cache::{SharedImage, SizeBudget};
use crate::key::CacheKey;

/// Which tier a request reads from and populates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StorageLocation {
    /// Decoded images in the memory tier
    #[default]
    Memory,
    /// Raw bytes in a disk directory
    Disk {
        /// Overrides the configured directory
        directory: Option<PathBuf>,
        /// Overrides the configured disk budget
        budget: Option<SizeBudget>,
    },
}

impl StorageLocation {
    /// Disk tier using the configured directory and budget
    pub fn disk() -> Self {
        StorageLocation::Disk {
            directory: None,
            budget: None,
        }
    }

    /// Disk tier in a specific directory
    pub fn disk_in(directory: impl Into<PathBuf>) -> Self {
        StorageLocation::Disk {
            directory: Some(directory.into()),
            budget: None,
        }
    }

    /// Attach a disk budget; no effect on the memory tier
    pub fn with_budget(self, budget: SizeBudget) -> Self {
        match self {
            StorageLocation::Memory => StorageLocation::Memory,
            StorageLocation::Disk { directory, .. } => StorageLocation::Disk {
                directory,
                budget: Some(budget),
            },
        }
    }
}

/// Where a result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Memory,
    Disk,
    Network,
}

/// Outcome of a single image request
#[derive(Debug, Clone)]
pub struct FetchedImage {
    /// Key of the artifact in the memory tier's key space
    pub key: CacheKey,
    /// Decoded (and possibly resized) image; `None` when the payload is not an image
    pub image: Option<SharedImage>,
    /// Location of the artifact on disk (disk tier only, absent if evicted)
    pub file_path: Option<PathBuf>,
    /// Which tier or the network produced the bytes
    pub origin: Origin,
}

impl FetchedImage {
    /// Whether the request was served without a network fetch
    pub fn is_hit(&self) -> bool {
        self.origin != Origin::Network
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.image.as_ref().map(|image| (image.width(), image.height()))
    }
}

/// Aggregate outcome of a prefetch fan-out
///
/// Failures are counted, not itemized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefetchSummary {
    /// Locators handed to the prefetcher
    pub requested: usize,
    /// Locators skipped because their artifact was already cached
    pub already_cached: usize,
    /// Locators fetched and stored
    pub fetched: usize,
    /// Locators that were invalid or failed to fetch or store
    pub failed: usize,
}
