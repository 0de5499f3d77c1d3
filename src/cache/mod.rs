//! Cache tiers
//!
//! Decoded images live in the memory tier; raw bytes live in the disk tier,
//! bounded by an optional size budget.

pub mod budget;
pub mod disk;
pub mod memory;

pub use budget::SizeBudget;
pub use disk::{combined_size, DiskStore, EvictionPolicy, FileRecord};
pub use memory::{LruMemoryStore, MemoryStore, MokaMemoryStore, SharedImage, DEFAULT_MEMORY_CAPACITY};
