//! Constructor-injected TTL cache.
//!
//! A thin wrapper over `moka` with per-entry time-to-live. Owning code
//! injects the cache through its constructor and ties invalidation to the
//! identity lifecycle (e.g. the profile cache is flushed on sign-out), so
//! no state hides in module-level globals.

use std::hash::Hash;
use std::time::{Duration, Instant};

use moka::Expiry;

#[derive(Clone)]
struct Entry<V> {
    ttl: Duration,
    value: V,
}

struct PerEntryTtl;

impl<K, V> Expiry<K, Entry<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &K,
        entry: &Entry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// A bounded cache whose entries each carry their own TTL.
pub struct TtlCache<K, V> {
    inner: moka::sync::Cache<K, Entry<V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: moka::sync::Cache::builder()
                .max_capacity(capacity)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }

    /// Look up a live entry.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key).map(|entry| entry.value)
    }

    /// Insert `value` under `key`, expiring after `ttl`.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        self.inner.insert(key, Entry { ttl, value });
    }

    /// Drop the entry under `key`, if present.
    pub fn invalidate(&self, key: &K) {
        self.inner.invalidate(key);
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}
