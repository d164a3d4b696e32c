//! Cache store: last-known-good values with staleness
//!
//! One entry per [`ResourceKey`]: the payload, when it was fetched, how long
//! it stays fresh, and an explicit stale mark set by invalidation. The map
//! is LRU-bounded, so entries nothing has read for a while fall out once
//! capacity is reached — that bound is the retention policy.
//!
//! Only the read/write executors in [`SyncClient`](crate::SyncClient)
//! write here; the lock is never held across an await.

use crate::key::ResourceKey;
use lru::LruCache;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct CacheEntry {
    value: Value,
    fetched_at: Instant,
    window: Duration,
    stale: bool,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        !self.stale && self.fetched_at.elapsed() < self.window
    }
}

/// Shared store of cache entries keyed by [`ResourceKey`].
pub struct CacheStore {
    entries: Mutex<LruCache<ResourceKey, CacheEntry>>,
}

impl CacheStore {
    /// Create a store retaining at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Fresh value for `key`, if one exists. Counts as an observation for
    /// retention purposes.
    pub fn get_fresh(&self, key: &ResourceKey) -> Option<Value> {
        let mut entries = self.lock();
        let entry = entries.get(key)?;
        if entry.is_fresh() {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Store `value` for `key`, fresh for `window`. Overwrites any previous
    /// entry and clears its stale mark.
    pub fn insert(&self, key: ResourceKey, value: Value, window: Duration) {
        tracing::debug!(key = %key, "cache write");
        self.lock().put(
            key,
            CacheEntry {
                value,
                fetched_at: Instant::now(),
                window,
                stale: false,
            },
        );
    }

    /// Mark every entry in the `prefix` family stale; the next observation
    /// of each triggers a refetch. Returns how many entries were marked.
    pub fn invalidate(&self, prefix: &ResourceKey) -> usize {
        let mut entries = self.lock();
        let mut marked = 0;
        for (key, entry) in entries.iter_mut() {
            if key.starts_with(prefix) && !entry.stale {
                entry.stale = true;
                marked += 1;
            }
        }
        tracing::debug!(prefix = %prefix, marked, "cache invalidation");
        marked
    }

    /// Remove every entry in the `prefix` family. Returns how many entries
    /// were removed.
    pub fn evict(&self, prefix: &ResourceKey) -> usize {
        self.evict_all(std::slice::from_ref(prefix))
    }

    /// Remove every entry in any of the given families under one lock, so
    /// the UI observes all of the evictions or none of them.
    pub fn evict_all(&self, prefixes: &[ResourceKey]) -> usize {
        let mut entries = self.lock();
        let doomed: Vec<ResourceKey> = entries
            .iter()
            .filter(|(key, _)| prefixes.iter().any(|prefix| key.starts_with(prefix)))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        doomed.len()
    }

    /// True if `key` holds a fresh value. Does not count as an observation.
    pub fn is_fresh(&self, key: &ResourceKey) -> bool {
        self.lock().peek(key).is_some_and(CacheEntry::is_fresh)
    }

    /// True if `key` holds any entry, fresh or stale.
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<ResourceKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MINUTE: Duration = Duration::from_secs(60);

    fn key(tokens: &[&str]) -> ResourceKey {
        ResourceKey::from_tokens(tokens.iter().copied())
    }

    #[test]
    fn test_fresh_within_window() {
        let store = CacheStore::new(8);
        store.insert(key(&["cart", "current"]), json!({"total": 0}), MINUTE);
        assert_eq!(
            store.get_fresh(&key(&["cart", "current"])),
            Some(json!({"total": 0}))
        );
    }

    #[test]
    fn test_expired_window_is_not_fresh() {
        let store = CacheStore::new(8);
        store.insert(key(&["cart", "current"]), json!({}), Duration::ZERO);
        assert_eq!(store.get_fresh(&key(&["cart", "current"])), None);
        assert!(store.contains(&key(&["cart", "current"])));
    }

    #[test]
    fn test_invalidate_marks_family_only() {
        let store = CacheStore::new(8);
        store.insert(key(&["cart", "current"]), json!({}), MINUTE);
        store.insert(key(&["orders", "list"]), json!([]), MINUTE);

        let marked = store.invalidate(&key(&["cart"]));
        assert_eq!(marked, 1);
        assert!(!store.is_fresh(&key(&["cart", "current"])));
        assert!(store.is_fresh(&key(&["orders", "list"])));
    }

    #[test]
    fn test_insert_clears_stale_mark() {
        let store = CacheStore::new(8);
        store.insert(key(&["cart", "current"]), json!({}), MINUTE);
        store.invalidate(&key(&["cart"]));
        store.insert(key(&["cart", "current"]), json!({"total": 10}), MINUTE);
        assert!(store.is_fresh(&key(&["cart", "current"])));
    }

    #[test]
    fn test_evict_all_removes_every_family() {
        let store = CacheStore::new(8);
        store.insert(key(&["user"]), json!({}), MINUTE);
        store.insert(key(&["cart", "current"]), json!({}), MINUTE);
        store.insert(key(&["orders", "list"]), json!([]), MINUTE);
        store.insert(key(&["products", "list"]), json!([]), MINUTE);

        let removed = store.evict_all(&[key(&["user"]), key(&["cart"]), key(&["orders"])]);
        assert_eq!(removed, 3);
        assert!(!store.contains(&key(&["user"])));
        assert!(!store.contains(&key(&["cart", "current"])));
        assert!(!store.contains(&key(&["orders", "list"])));
        assert!(store.contains(&key(&["products", "list"])));
    }

    #[test]
    fn test_capacity_bound_drops_least_recently_read() {
        let store = CacheStore::new(2);
        store.insert(key(&["a"]), json!(1), MINUTE);
        store.insert(key(&["b"]), json!(2), MINUTE);
        // Observe "a" so "b" becomes the eviction candidate.
        store.get_fresh(&key(&["a"]));
        store.insert(key(&["c"]), json!(3), MINUTE);

        assert!(store.contains(&key(&["a"])));
        assert!(!store.contains(&key(&["b"])));
        assert!(store.contains(&key(&["c"])));
    }
}
