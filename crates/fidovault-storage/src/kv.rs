//! TTL key-value storage trait.
//!
//! This module defines the storage interface for TTL-bound blobs. Records
//! expire on their own after the configured window; every write re-arms the
//! TTL ("touch" semantics), so an active flow keeps its session alive while
//! an abandoned one ages out.
//!
//! # Implementation Notes
//!
//! Implementations must:
//!
//! - Treat expired keys exactly like missing keys on read
//! - Make `put` an atomic replace (last write wins; no partial values)
//! - Make `take` atomic (get + delete in one step) - this is what gives the
//!   PKCE derived index its single-use guarantee
//!
//! # Security Considerations
//!
//! - Keys may embed client-derived material (PKCE challenges); never log
//!   full keys at info level or above
//! - Values are opaque bytes to this layer; encryption at rest is the
//!   backend's concern

use std::time::Duration;

use async_trait::async_trait;

use crate::StorageResult;

/// Storage trait for TTL-bound key-value records.
///
/// Implementations must be thread-safe (`Send + Sync`); per-key operations
/// must be atomic. No cross-key transactionality is required.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use fidovault_storage::{KeyValueStore, MemoryKv};
///
/// # tokio_test::block_on(async {
/// let store = MemoryKv::new();
/// store.put("k", b"v".to_vec(), Duration::from_secs(60)).await.unwrap();
/// assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
/// # });
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Stores `value` under `key` with the given time-to-live.
    ///
    /// Replaces any existing value and re-arms the TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StorageResult<()>;

    /// Retrieves the value stored under `key`.
    ///
    /// Returns `None` for missing and for expired keys alike.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure failures, never for absence.
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Atomically retrieves and deletes the value stored under `key`.
    ///
    /// If two callers race on the same key, at most one observes the value.
    /// Returns `None` for missing and expired keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn take(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Deletes the value stored under `key`, if any.
    ///
    /// Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn delete(&self, key: &str) -> StorageResult<()>;
}
