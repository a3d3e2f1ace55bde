//! Signing key persistence.
//!
//! The repository holds [`StoredKey`] records with wrapped private
//! material. Unlike session data, keys never expire by TTL; lifecycle is
//! driven entirely by status flips.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::error::AuthError;
use crate::keystore::key::{KeyScope, KeyStatus, StoredKey};

/// Shared reference to a key repository.
pub type DynKeyRepository = Arc<dyn KeyRepository>;

/// Persistent storage for signing keys.
///
/// # Contract
///
/// - `insert` on an existing id replaces the record.
/// - `find_active` returns the single Active key for the scope, if any.
///   Writers maintain the one-Active-per-scope invariant; the repository
///   itself does not enforce it.
/// - `set_status` on a missing id is an error, not a silent no-op.
#[async_trait]
pub trait KeyRepository: Send + Sync {
    /// Stores a key record.
    async fn insert(&self, key: StoredKey) -> Result<(), AuthError>;

    /// Retrieves a key by id.
    async fn get(&self, id: &str) -> Result<Option<StoredKey>, AuthError>;

    /// Retrieves the Active key for a scope.
    async fn find_active(&self, scope: KeyScope) -> Result<Option<StoredKey>, AuthError>;

    /// Updates a key's lifecycle status.
    async fn set_status(&self, id: &str, status: KeyStatus) -> Result<(), AuthError>;
}

/// In-memory key repository.
#[derive(Debug, Default)]
pub struct MemoryKeyRepository {
    keys: DashMap<String, StoredKey>,
}

impl MemoryKeyRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if no keys are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl KeyRepository for MemoryKeyRepository {
    async fn insert(&self, key: StoredKey) -> Result<(), AuthError> {
        self.keys.insert(key.id.clone(), key);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<StoredKey>, AuthError> {
        Ok(self.keys.get(id).map(|entry| entry.clone()))
    }

    async fn find_active(&self, scope: KeyScope) -> Result<Option<StoredKey>, AuthError> {
        Ok(self
            .keys
            .iter()
            .find(|entry| entry.scope == scope && entry.status == KeyStatus::Active)
            .map(|entry| entry.clone()))
    }

    async fn set_status(&self, id: &str, status: KeyStatus) -> Result<(), AuthError> {
        match self.keys.get_mut(id) {
            Some(mut entry) => {
                entry.status = status;
                Ok(())
            }
            None => Err(AuthError::key_not_found(id)),
        }
    }
}
