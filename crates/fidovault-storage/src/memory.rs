//! In-memory key-value backend.
//!
//! Backs the [`KeyValueStore`] trait with a concurrent map for single-node
//! deployments and tests. Expiry is enforced lazily on read: an expired
//! entry is indistinguishable from a missing one and is removed when
//! touched. Deadlines use tokio's clock so TTL behavior is testable with
//! `tokio::time::pause`.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::kv::KeyValueStore;
use crate::{StorageError, StorageResult};

struct Entry {
    value: Vec<u8>,
    deadline: Instant,
}

impl Entry {
    fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// In-memory TTL key-value store.
///
/// Cheap to clone behind an `Arc`; all handles share one map.
#[derive(Default)]
pub struct MemoryKv {
    entries: DashMap<String, Entry>,
}

impl MemoryKv {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, including not-yet-collected
    /// expired ones. Test helper.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StorageResult<()> {
        let deadline = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| StorageError::backend("ttl overflow"))?;
        self.entries.insert(key.to_string(), Entry { value, deadline });
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.expired() {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }
        // expired: collect it so the map does not grow unbounded
        self.entries.remove_if(key, |_, e| e.expired());
        Ok(None)
    }

    async fn take(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        // remove is the atomic step; expiry is checked on what came out
        match self.entries.remove(key) {
            Some((_, entry)) if !entry.expired() => Ok(Some(entry.value)),
            _ => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}
