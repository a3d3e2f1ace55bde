//! Envelope encryption seam for private key material.
//!
//! Private key DER never reaches the key repository as plaintext in KMS
//! deployments; it is wrapped by an external key-management service and
//! unwrapped on load. Deployments without a KMS use the pass-through
//! wrapper and rely on storage-level encryption instead.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::AuthError;

/// Shared reference to a key wrapper.
pub type DynKeyWrapper = Arc<dyn KeyWrapper>;

/// Wraps and unwraps private key material at rest.
///
/// # Contract
///
/// - `unwrap(wrap(m)) == m` for any material `m`.
/// - Failures are surfaced as [`AuthError::UpstreamKms`] and are fatal for
///   the calling operation only, never for the process.
/// - Implementations must not log plaintext material at any level.
#[async_trait]
pub trait KeyWrapper: Send + Sync {
    /// Wraps plaintext private key material for storage.
    async fn wrap(&self, plaintext: &[u8]) -> Result<Vec<u8>, AuthError>;

    /// Unwraps stored material back to plaintext.
    async fn unwrap(&self, wrapped: &[u8]) -> Result<Vec<u8>, AuthError>;
}

/// Pass-through wrapper for deployments without an external KMS.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainWrapper;

#[async_trait]
impl KeyWrapper for PlainWrapper {
    async fn wrap(&self, plaintext: &[u8]) -> Result<Vec<u8>, AuthError> {
        Ok(plaintext.to_vec())
    }

    async fn unwrap(&self, wrapped: &[u8]) -> Result<Vec<u8>, AuthError> {
        Ok(wrapped.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_wrapper_roundtrip() {
        let wrapper = PlainWrapper;
        let wrapped = wrapper.wrap(b"material").await.unwrap();
        let plain = wrapper.unwrap(&wrapped).await.unwrap();
        assert_eq!(plain, b"material");
    }
}
