//! Shared TTL cache
//!
//! One generic time-bounded memoization layer backs the three per-request
//! hot paths: parsed-token claims, password-check results, and
//! authorization decisions. Each instance carries a fixed TTL; entries
//! observed past their expiry are misses regardless of whether they have
//! been physically removed yet. A background sweep (driven by
//! [`crate::service::AccessControl::spawn_background`]) performs the
//! eventual physical removal.

use std::borrow::Borrow;
use std::hash::Hash;
use std::time::Duration;

use moka::sync::Cache;

const MAX_ENTRIES: u64 = 10_000;

/// Thread-safe key/value store with per-entry absolute expiry.
pub struct TtlCache<K, V> {
    inner: Cache<K, V>,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache whose entries expire `ttl` after insertion.
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(MAX_ENTRIES)
                .build(),
        }
    }

    /// Look up a key. Absent or expired entries are misses.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.get(key)
    }

    /// Store a value with expiry `now + ttl`.
    pub fn insert(&self, key: K, value: V) {
        self.inner.insert(key, value);
    }

    /// Drop all entries immediately.
    ///
    /// Used by tests and by the reload/rotation paths that must not serve
    /// stale decisions.
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    /// Physically remove entries whose expiry has passed.
    pub fn sweep(&self) {
        self.inner.run_pending_tasks();
    }

    /// Number of physically resident entries. Call [`Self::sweep`] first
    /// for an exact count.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("entries", &self.inner.entry_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("a".to_string(), 1);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_millis(20));
        cache.insert("a".to_string(), 1);
        assert_eq!(cache.get("a"), Some(1));

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn test_clear_drops_everything() {
        let cache: TtlCache<String, bool> = TtlCache::new(Duration::from_secs(60));
        cache.insert("a".to_string(), true);
        cache.insert("b".to_string(), false);
        cache.clear();
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn test_sweep_physically_removes_dead_entries() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_millis(20));
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);
        cache.sweep();
        assert_eq!(cache.entry_count(), 2);

        std::thread::sleep(Duration::from_millis(40));
        cache.sweep();
        assert_eq!(cache.entry_count(), 0);
    }

    #[test]
    fn test_overwrite_refreshes_value() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("a".to_string(), 1);
        cache.insert("a".to_string(), 2);
        assert_eq!(cache.get("a"), Some(2));
    }
}
