//! Key Codec
//!
//! Derives stable cache keys and filesystem-safe file names from locators.
//!
//! File names are the sanitized locator appended to a fixed prefix. Stripping
//! characters is not injective in general (`a:b` and `ab` collide); for
//! well-formed URLs this is accepted as a known limitation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use url::Url;

use crate::error::{CacheError, Result};

/// Prefix shared by every file the engine owns in a disk directory
pub const FILE_NAME_PREFIX: &str = "pixcache";

/// Longest file name most filesystems accept, in bytes
const MAX_FILE_NAME_LEN: usize = 255;

/// Hex length of a SHA-1 digest
const DIGEST_HEX_LEN: usize = 40;

/// Requested output dimensions, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A target with a zero dimension can never hold a resized image
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for TargetSize {
    type Err = String;

    /// Parse `WIDTHxHEIGHT`, e.g. `320x240`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (width, height) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("Expected WIDTHxHEIGHT, got '{}'", s))?;
        let width = width
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("Invalid width '{}': {}", width, e))?;
        let height = height
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("Invalid height '{}': {}", height, e))?;
        Ok(Self { width, height })
    }
}

/// Key identifying one cached artifact in the memory tier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse a raw locator string into its canonical URL form
///
/// Fails with `InvalidLocator` for empty or unparseable input, before any I/O.
pub fn parse_locator(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CacheError::InvalidLocator("empty locator".to_string()));
    }
    Url::parse(trimmed).map_err(|e| CacheError::InvalidLocator(format!("'{}': {}", trimmed, e)))
}

/// Derive the cache key for a locator, folding in the target size if present
///
/// # Arguments
/// * `locator` - Canonical resource URL
/// * `size` - Target dimensions when resizing is requested
pub fn derive_key(locator: &Url, size: Option<TargetSize>) -> CacheKey {
    match size {
        Some(size) => CacheKey(format!("{}/{}/{}", locator.as_str(), size.width, size.height)),
        None => CacheKey(locator.as_str().to_string()),
    }
}

/// Derive the on-disk file name for a locator
///
/// Names longer than the filesystem limit are truncated and suffixed with
/// the SHA-1 of the full locator.
pub fn derive_file_name(locator: &Url) -> String {
    let sanitized: String = locator.as_str().chars().filter(|c| !is_illegal(*c)).collect();
    let name = format!("{}-{}", FILE_NAME_PREFIX, sanitized);

    if name.len() <= MAX_FILE_NAME_LEN {
        return name;
    }

    let mut hasher = Sha1::new();
    hasher.update(locator.as_str().as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    let mut cut = MAX_FILE_NAME_LEN - DIGEST_HEX_LEN - 1;
    while !name.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}-{}", &name[..cut], digest)
}

/// Characters that cannot appear in a portable file name
fn is_illegal(c: char) -> bool {
    matches!(
        c,
        '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\u{2028}' | '\u{2029}' | '\u{FFFD}'
    ) || c.is_control()
}
