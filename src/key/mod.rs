//! Cache key derivation
//!
//! Memory keys and disk file names are derived independently from the same
//! locator and are never interchanged.

pub mod codec;

pub use codec::{derive_file_name, derive_key, parse_locator, CacheKey, TargetSize, FILE_NAME_PREFIX};
