//! Disk Store
//!
//! Persists raw artifacts in a flat directory and bounds their combined size.
//! Presence and eviction order come from the directory listing and file
//! metadata; there is no side index.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::budget::SizeBudget;
use crate::error::{CacheError, Result};
use crate::key::FILE_NAME_PREFIX;

/// Prefix of in-progress atomic writes (never counted as owned files)
const TEMP_PREFIX: &str = ".pixcache-";
const TEMP_SUFFIX: &str = ".tmp";

/// Temp files older than this are leftovers from interrupted writes
pub const STALE_TEMP_AGE: Duration = Duration::from_secs(10 * 60);

/// How much to delete when a directory is over budget
///
/// The two policies differ when the newest file alone exceeds the budget:
/// `SingleOldest` deletes it if it is the only owned file, while
/// `UntilUnderBudget` always keeps the last owned file. With files of mixed
/// sizes, only `UntilUnderBudget` guarantees that a write plus eviction never
/// leaves the directory larger than it was before the write. `SingleOldest`
/// can overshoot the budget by up to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvictionPolicy {
    /// Delete at most the single oldest file per check
    #[default]
    SingleOldest,
    /// Delete oldest-first until under budget or one file remains
    UntilUnderBudget,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oldest" | "single-oldest" => Ok(EvictionPolicy::SingleOldest),
            "until-under-budget" | "all" => Ok(EvictionPolicy::UntilUnderBudget),
            other => Err(format!("Unknown eviction policy '{}'", other)),
        }
    }
}

/// An engine-owned file, as seen in the directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// File name within the store directory
    pub file_name: String,
    /// Creation time (modification time where the platform has no birth time)
    pub created: SystemTime,
    /// Size in bytes
    pub size: u64,
}

/// Sum of record sizes
pub fn combined_size(records: &[FileRecord]) -> u64 {
    records.iter().map(|r| r.size).sum()
}

/// Eviction order: earliest creation first, ties by file name
fn eviction_order(a: &FileRecord, b: &FileRecord) -> std::cmp::Ordering {
    a.created
        .cmp(&b.created)
        .then_with(|| a.file_name.cmp(&b.file_name))
}

/// Directory-backed store of raw artifact bytes
#[derive(Debug)]
pub struct DiskStore {
    /// Directory holding the artifacts
    dir: PathBuf,
}

impl DiskStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    ///
    /// Stale temp files from interrupted writes are removed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;

        let store = Self { dir };
        store.cleanup(STALE_TEMP_AGE);

        debug!(dir = %store.dir.display(), "Disk store opened");
        Ok(store)
    }

    /// Directory this store writes into
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path for a file name in this store
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    pub fn exists(&self, file_name: &str) -> bool {
        self.path_for(file_name).is_file()
    }

    /// Read an artifact's bytes
    pub fn read(&self, file_name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(file_name);
        fs::read(&path).map_err(|e| CacheError::io(&path, e))
    }

    /// Write an artifact atomically and durably
    ///
    /// Data goes to a temp file in the same directory, is synced, then renamed
    /// over the target, so readers never observe a partial file. Concurrent
    /// writers to the same name each land whole; the last rename wins.
    ///
    /// # Returns
    /// Path of the written artifact
    pub fn write(&self, file_name: &str, data: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(file_name);

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&self.dir)
            .map_err(|e| CacheError::io(&self.dir, e))?;

        tmp.write_all(data).map_err(|e| CacheError::io(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| CacheError::io(tmp.path(), e))?;

        tmp.persist(&path)
            .map_err(|e| CacheError::io(&path, e.error))?;
        self.sync_dir();

        debug!(file = %path.display(), size = data.len(), "Stored artifact on disk");
        Ok(path)
    }

    /// Persist the rename itself; needed for durability on Unix filesystems
    #[cfg(unix)]
    fn sync_dir(&self) {
        if let Err(e) = fs::File::open(&self.dir).and_then(|dir| dir.sync_all()) {
            warn!(dir = %self.dir.display(), error = %e, "Failed to sync cache directory");
        }
    }

    #[cfg(not(unix))]
    fn sync_dir(&self) {}

    /// Remove an artifact; a missing file is not an error
    pub fn remove(&self, file_name: &str) -> Result<()> {
        let path = self.path_for(file_name);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(file = %path.display(), "Removed artifact");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io(&path, e)),
        }
    }

    /// Enumerate engine-owned files, ignoring anything else in the directory
    pub fn list_owned(&self) -> Result<Vec<FileRecord>> {
        let owned_prefix = format!("{}-", FILE_NAME_PREFIX);
        let read_dir = fs::read_dir(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;

        let mut records = Vec::new();
        for entry in read_dir.flatten() {
            let file_name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if !file_name.starts_with(&owned_prefix) {
                continue;
            }
            // Entries can vanish between listing and stat under concurrent eviction
            let metadata = match entry.metadata() {
                Ok(metadata) if metadata.is_file() => metadata,
                _ => continue,
            };
            let created = metadata
                .created()
                .or_else(|_| metadata.modified())
                .unwrap_or(UNIX_EPOCH);

            records.push(FileRecord {
                file_name,
                created,
                size: metadata.len(),
            });
        }

        Ok(records)
    }

    /// Delete the single oldest owned file if the directory is over budget
    ///
    /// Best-effort: listing and deletion failures are logged and swallowed.
    ///
    /// # Returns
    /// The evicted record, if any
    pub fn evict_oldest_if_over_budget(&self, budget: SizeBudget) -> Option<FileRecord> {
        let records = match self.list_owned() {
            Ok(records) => records,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Failed to list cache for eviction");
                return None;
            }
        };

        let total = combined_size(&records);
        if !budget.is_exceeded_by(total) {
            return None;
        }

        info!(
            total_bytes = total,
            budget_bytes = budget.bytes(),
            "Disk cache exceeds budget, evicting oldest file"
        );

        let oldest = records.into_iter().min_by(eviction_order)?;
        self.delete_record(oldest)
    }

    /// Delete oldest-first until the directory is within budget
    ///
    /// Stops early when a single owned file remains, so the most recent
    /// artifact survives even if it alone exceeds the budget.
    pub fn evict_until_under_budget(&self, budget: SizeBudget) -> Vec<FileRecord> {
        let mut records = match self.list_owned() {
            Ok(records) => records,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Failed to list cache for eviction");
                return Vec::new();
            }
        };

        let mut total = combined_size(&records);
        if !budget.is_exceeded_by(total) {
            return Vec::new();
        }

        info!(
            total_bytes = total,
            budget_bytes = budget.bytes(),
            "Disk cache exceeds budget, evicting until under budget"
        );

        records.sort_by(eviction_order);
        let mut remaining = records.len();
        let mut evicted = Vec::new();

        for record in records {
            if !budget.is_exceeded_by(total) || remaining <= 1 {
                break;
            }
            remaining -= 1;
            let size = record.size;
            if let Some(record) = self.delete_record(record) {
                total = total.saturating_sub(size);
                evicted.push(record);
            }
        }

        evicted
    }

    /// Apply an eviction policy against a budget
    pub fn enforce_budget(&self, budget: SizeBudget, policy: EvictionPolicy) -> Vec<FileRecord> {
        match policy {
            EvictionPolicy::SingleOldest => {
                self.evict_oldest_if_over_budget(budget).into_iter().collect()
            }
            EvictionPolicy::UntilUnderBudget => self.evict_until_under_budget(budget),
        }
    }

    fn delete_record(&self, record: FileRecord) -> Option<FileRecord> {
        let path = self.path_for(&record.file_name);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(file = %path.display(), size = record.size, "Evicted cached file");
                Some(record)
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Failed to evict cached file");
                None
            }
        }
    }

    /// Remove temp files left behind by interrupted writes
    ///
    /// Only files older than `max_age` are touched, so in-flight writes survive.
    pub fn cleanup(&self, max_age: Duration) {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(_) => return,
        };
        let now = SystemTime::now();

        for entry in read_dir.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !(name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)) {
                continue;
            }
            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age >= max_age {
                let path = entry.path();
                match fs::remove_file(&path) {
                    Ok(()) => debug!(path = %path.display(), "Removed stale temp file"),
                    Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove stale temp file"),
                }
            }
        }
    }
}
