//! # fidovault-storage
//!
//! Storage abstraction for the ephemeral, TTL-bound records FidoVault keeps:
//! authorization sessions, PKCE derived indexes, and anything else that must
//! disappear on its own after a fixed window.
//!
//! The [`KeyValueStore`] trait is the contract all backends implement; an
//! in-memory backend ([`MemoryKv`]) is provided for single-node deployments
//! and tests. Production deployments back it with an external keyed cache
//! whose per-key operations are atomic.

pub mod error;
pub mod kv;
pub mod memory;

pub use error::StorageError;
pub use kv::KeyValueStore;
pub use memory::MemoryKv;

/// Type alias for storage results.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shareable store instance.
pub type DynKeyValueStore = std::sync::Arc<dyn KeyValueStore>;
