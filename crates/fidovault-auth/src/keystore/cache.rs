//! Bounded-lifetime cache for loaded signing keys.
//!
//! Loaded keys are cached both under their own id and under the scope alias
//! of the Active key, so issuance (lookup by scope) and verification
//! (lookup by `kid`) share one cache. Entries lapse after a fixed idle
//! window regardless of key status; status checks on hits are the caller's
//! responsibility.

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::keystore::key::KeyHandle;

#[derive(Clone)]
struct CacheEntry {
    handle: KeyHandle,
    deadline: Instant,
}

/// Concurrent key cache with a fixed idle TTL.
pub struct KeyCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl KeyCache {
    /// Creates a cache whose entries lapse `ttl` after last touch.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Looks up a key by cache name (scope alias or key id).
    ///
    /// A hit re-arms the entry's idle window. Lapsed entries are removed
    /// on access and reported as a miss.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<KeyHandle> {
        let now = Instant::now();
        if let Some(mut entry) = self.entries.get_mut(name) {
            if entry.deadline > now {
                entry.deadline = now + self.ttl;
                return Some(entry.handle.clone());
            }
        }
        // lock released above; safe to collect the lapsed entry
        self.entries
            .remove_if(name, |_, entry| entry.deadline <= now);
        None
    }

    /// Caches a key under a single name.
    pub fn put(&self, name: impl Into<String>, handle: KeyHandle) {
        self.entries.insert(
            name.into(),
            CacheEntry {
                handle,
                deadline: Instant::now() + self.ttl,
            },
        );
    }

    /// Caches a key under both its own id and the given alias.
    pub fn put_aliased(&self, alias: &str, handle: KeyHandle) {
        self.put(handle.id.clone(), handle.clone());
        self.put(alias, handle);
    }

    /// Drops an entry.
    pub fn evict(&self, name: &str) {
        self.entries.remove(name);
    }

    /// Number of live names (including lapsed entries not yet collected).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCache")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
