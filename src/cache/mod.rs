//! # Read Cache
//!
//! In-memory read-through cache of raw file content, keyed by storage key.
//!
//! The cache is never authoritative: entries may vanish at any time and a
//! miss is always resolved by reading persisted storage. There is no
//! eviction; the map grows with the number of distinct keys read.

mod read_cache;

pub use read_cache::{CacheStats, ReadCache};
