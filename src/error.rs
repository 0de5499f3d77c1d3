//! Cache Error Types
//!
//! Errors surfaced by the image cache engine. Decode failures are not errors:
//! an undecodable payload is reported as an absent image instead.

use std::path::{Path, PathBuf};

use crate::fetch::FetchError;

/// Image cache error types
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Background task failed: {0}")]
    Task(String),
}

impl CacheError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Whether the caller should treat this failure as a cache miss and re-fetch
    ///
    /// Disk reads can race with best-effort eviction; those surface as `Io`.
    pub fn is_cache_miss(&self) -> bool {
        matches!(self, CacheError::Io { .. })
    }
}

impl From<tokio::task::JoinError> for CacheError {
    fn from(err: tokio::task::JoinError) -> Self {
        CacheError::Task(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
