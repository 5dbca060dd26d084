//! Time-bounded cache for transient conversational state.
//!
//! Group context (rosters, recent group turns) lives here rather than in
//! the persona store: it is cheap to rebuild and must expire on its own so
//! a stale roster never outlives the conversation it described.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

/// A TTL cache. Entries expire `ttl` after insertion; reads past the
/// deadline behave as misses and drop the entry.
///
/// All time-sensitive methods have an `_at` variant taking an explicit
/// instant, so tests can drive the clock instead of sleeping.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, (V, Instant)>>,
    ttl: Duration,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    /// Create a cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Insert or replace an entry, stamping it with the current time.
    pub fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    /// Insert or replace an entry with an explicit insertion time.
    pub fn insert_at(&self, key: K, value: V, now: Instant) {
        self.entries.lock().insert(key, (value, now + self.ttl));
    }

    /// Fetch an entry, treating expired entries as misses.
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Fetch an entry against an explicit clock reading.
    pub fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((value, expiry)) if *expiry > now => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                trace!("cache entry expired");
                None
            }
            None => None,
        }
    }

    /// Read-modify-write under the lock, inserting a default when the entry
    /// is missing or expired.
    pub fn update_at<F>(&self, key: K, now: Instant, default: V, f: F)
    where
        F: FnOnce(&mut V),
    {
        let mut entries = self.entries.lock();
        let slot = match entries.remove(&key) {
            Some((value, expiry)) if expiry > now => value,
            _ => default,
        };
        let mut value = slot;
        f(&mut value);
        entries.insert(key, (value, now + self.ttl));
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self, now: Instant) {
        self.entries.lock().retain(|_, (_, expiry)| *expiry > now);
    }

    /// Number of live plus expired-but-unevicted entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
