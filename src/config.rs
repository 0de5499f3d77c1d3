//! Engine configuration
//!
//! Defaults can be overridden from the environment:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `PIXCACHE_DIR` | default disk directory |
//! | `PIXCACHE_MEMORY_CAPACITY` | decoded images kept in memory |
//! | `PIXCACHE_DISK_BUDGET` | default disk budget, e.g. `50MB` |
//! | `PIXCACHE_EVICTION` | `oldest` or `until-under-budget` |
//! | `PIXCACHE_PREFETCH_CONCURRENCY` | cap on in-flight prefetches |
//! | `PIXCACHE_TIMEOUT_SECS` | HTTP request timeout |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::cache::{EvictionPolicy, SizeBudget, DEFAULT_MEMORY_CAPACITY};
use crate::fetch::DEFAULT_REQUEST_TIMEOUT;

pub const ENV_DIR: &str = "PIXCACHE_DIR";
pub const ENV_MEMORY_CAPACITY: &str = "PIXCACHE_MEMORY_CAPACITY";
pub const ENV_DISK_BUDGET: &str = "PIXCACHE_DISK_BUDGET";
pub const ENV_EVICTION: &str = "PIXCACHE_EVICTION";
pub const ENV_PREFETCH_CONCURRENCY: &str = "PIXCACHE_PREFETCH_CONCURRENCY";
pub const ENV_TIMEOUT_SECS: &str = "PIXCACHE_TIMEOUT_SECS";

/// Configuration for an image cache instance
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Disk directory used when a request does not name one
    pub directory: PathBuf,
    /// Maximum number of decoded images in the memory tier
    pub memory_capacity: u64,
    /// Disk budget used when a request does not name one
    pub disk_budget: Option<SizeBudget>,
    /// What to delete when a directory is over budget
    pub eviction_policy: EvictionPolicy,
    /// Cap on concurrent prefetches (`None` = unbounded)
    pub prefetch_concurrency: Option<usize>,
    /// HTTP request timeout
    pub request_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            disk_budget: None,
            eviction_policy: EvictionPolicy::default(),
            prefetch_concurrency: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl CacheConfig {
    /// Defaults overlaid with `PIXCACHE_*` environment variables
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from a variable lookup
    ///
    /// Unparseable values are logged and ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DIR).filter(|d| !d.trim().is_empty()) {
            self.directory = PathBuf::from(dir);
        }
        if let Some(capacity) = parse_var::<u64, _>(&lookup, ENV_MEMORY_CAPACITY) {
            self.memory_capacity = capacity;
        }
        if let Some(budget) = parse_var::<SizeBudget, _>(&lookup, ENV_DISK_BUDGET) {
            self.disk_budget = Some(budget);
        }
        if let Some(policy) = parse_var::<EvictionPolicy, _>(&lookup, ENV_EVICTION) {
            self.eviction_policy = policy;
        }
        if let Some(limit) = parse_var::<usize, _>(&lookup, ENV_PREFETCH_CONCURRENCY) {
            self.prefetch_concurrency = (limit > 0).then_some(limit);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_TIMEOUT_SECS) {
            self.request_timeout = Duration::from_secs(secs);
        }
        self
    }
}

/// Platform cache directory, falling back to the system temp dir
pub fn default_directory() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("pixcache")
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(variable = name, value = %raw, error = %e, "Ignoring invalid setting");
            None
        }
    }
}
