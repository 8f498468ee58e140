//! Key-value cache contract used by the repository, and a thread-safe in-memory implementation.
//!
//! The repository uses two independent regions: [`FEATURES_CACHE_KEY`] holds the parsed
//! [`FeatureSet`](crate::FeatureSet) for a short time, and [`RAW_FEATURES_CACHE_KEY`] holds the
//! last raw payload fetched from the server for much longer, so it can stand in for the server
//! during an outage.
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
    time::{Duration, Instant},
};

/// Cache key of the parsed feature snapshot.
pub const FEATURES_CACHE_KEY: &str = "feature_repository.features";
/// Cache key of the last raw payload received from the server.
pub const RAW_FEATURES_CACHE_KEY: &str = "feature_repository.features.raw";

/// A key-value store with per-entry time-to-live.
///
/// Implementations must be safe for concurrent use if the repository is shared between threads.
pub trait Cache<V> {
    /// Returns `true` if `key` holds a value that has not expired.
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Get the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<V>;

    /// Get the value stored under `key` or `default` if there is none.
    fn get_or(&self, key: &str, default: V) -> V {
        self.get(key).unwrap_or(default)
    }

    /// Store `value` under `key` for `ttl`, replacing any previous value.
    fn set(&self, key: &str, value: V, ttl: Duration);
}

impl<V, C: Cache<V> + ?Sized> Cache<V> for Arc<C> {
    fn has(&self, key: &str) -> bool {
        (**self).has(key)
    }

    fn get(&self, key: &str) -> Option<V> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: V, ttl: Duration) {
        (**self).set(key, value, ttl)
    }
}

struct Entry<V> {
    value: V,
    /// `None` if the ttl is too large to represent. Such entries never expire.
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| now < expires_at)
    }
}

/// An in-memory [`Cache`] backed by a `RwLock<HashMap>`.
///
/// Expired entries are dropped lazily on the next write to the same key.
pub struct InMemoryCache<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
}

impl<V> InMemoryCache<V> {
    /// Create a new empty cache.
    pub fn new() -> Self {
        InMemoryCache {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Remove all entries, expired or not.
    pub fn clear(&self) {
        // A poisoned lock only means a writer panicked mid-update. The map itself is still
        // consistent, so we keep using it.
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<V> Default for InMemoryCache<V> {
    fn default() -> Self {
        InMemoryCache::new()
    }
}

impl<V: Clone> Cache<V> for InMemoryCache<V> {
    fn has(&self, key: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .is_some_and(|entry| entry.is_live(Instant::now()))
    }

    fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| entry.value.clone())
    }

    fn set(&self, key: &str, value: V, ttl: Duration) {
        // Constructing new value before requesting the lock to minimize lock span.
        let entry = Entry {
            value,
            expires_at: Instant::now().checked_add(ttl),
        };

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), entry);
    }
}
