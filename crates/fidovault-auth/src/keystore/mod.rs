//! Signing key lifecycle: generation, envelope wrapping, rotation and a
//! bounded-lifetime lookup cache shared by issuance and verification.

pub mod cache;
pub mod key;
pub mod kms;
pub mod service;
pub mod store;

pub use cache::KeyCache;
pub use key::{Jwk, JwkSet, KeyHandle, KeyScope, KeyStatus, StoredKey};
pub use kms::{DynKeyWrapper, KeyWrapper, PlainWrapper};
pub use service::{Keystore, in_memory_keystore};
pub use store::{DynKeyRepository, KeyRepository, MemoryKeyRepository};
