//! Shared read cache
//!
//! Readers share the lock; `set`, `delete` and `clear` take it exclusively.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

/// Cache statistics for observability.
///
/// Counters are passive and never influence caching.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
}

/// Content cache shared by all sessions
#[derive(Debug, Default)]
pub struct ReadCache {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ReadCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key. Absence is not an error.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let found = self.entries.read().get(key).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Insert or replace the content for a key
    pub fn set(&self, key: impl Into<String>, value: Vec<u8>) {
        self.entries.write().insert(key.into(), value);
    }

    /// Remove a key, returning whether it was present
    pub fn delete(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Check if a key is cached without touching the counters.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Get the number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Snapshot of the hit/miss counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_set_then_get() {
        let cache = ReadCache::new();
        cache.set("alice/notes.txt", b"hello".to_vec());

        assert_eq!(cache.get("alice/notes.txt"), Some(b"hello".to_vec()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_missing_key_is_not_an_error() {
        let cache = ReadCache::new();
        assert_eq!(cache.get("nope"), None);
    }

    #[test]
    fn test_set_replaces_value() {
        let cache = ReadCache::new();
        cache.set("k", b"v1".to_vec());
        cache.set("k", b"v2".to_vec());
        assert_eq!(cache.get("k"), Some(b"v2".to_vec()));
    }

    #[test]
    fn test_delete() {
        let cache = ReadCache::new();
        cache.set("k", b"v".to_vec());

        assert!(cache.delete("k"));
        assert_eq!(cache.get("k"), None);
        assert!(!cache.delete("k"));
    }

    #[test]
    fn test_clear() {
        let cache = ReadCache::new();
        cache.set("a", b"1".to_vec());
        cache.set("b", b"2".to_vec());

        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn test_stats_are_passive() {
        let cache = ReadCache::new();
        cache.set("a", b"1".to_vec());

        let _ = cache.get("a");
        let _ = cache.get("a");
        let _ = cache.get("b");
        assert!(cache.contains("a"));

        assert_eq!(cache.stats(), CacheStats { hits: 2, misses: 1 });
    }

    #[test]
    fn test_concurrent_readers_and_writers() {
        let cache = Arc::new(ReadCache::new());
        let mut handles = Vec::new();

        for t in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for i in 0..200 {
                    let key = format!("t{}-{}", t, i);
                    cache.set(key.clone(), vec![t as u8]);
                    assert_eq!(cache.get(&key), Some(vec![t as u8]));
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 8 * 200);
    }
}
