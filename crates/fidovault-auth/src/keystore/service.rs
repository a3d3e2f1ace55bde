//! Key lifecycle service.
//!
//! Owns generation-on-first-use, rotation, envelope wrapping and the shared
//! key cache. Every cache hit still goes through a status check, so a key
//! disabled after caching cannot keep signing or verifying until eviction.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::keystore::cache::KeyCache;
use crate::keystore::key::{Jwk, JwkSet, KeyHandle, KeyScope, KeyStatus, StoredKey};
use crate::keystore::kms::DynKeyWrapper;
use crate::keystore::store::DynKeyRepository;

/// Signing key lifecycle service.
pub struct Keystore {
    repository: DynKeyRepository,
    wrapper: DynKeyWrapper,
    cache: KeyCache,
}

impl Keystore {
    /// Creates a keystore over the given repository and wrapper, with the
    /// given cache idle window.
    #[must_use]
    pub fn new(repository: DynKeyRepository, wrapper: DynKeyWrapper, cache_ttl: Duration) -> Self {
        Self {
            repository,
            wrapper,
            cache: KeyCache::new(cache_ttl),
        }
    }

    /// Returns the Active key for `scope`, generating one on first use.
    pub async fn ensure_active_key(&self, scope: KeyScope) -> Result<KeyHandle, AuthError> {
        if let Some(handle) = self.cache.get(scope.alias()) {
            if handle.status == KeyStatus::Active {
                return Ok(handle);
            }
            // rotated or disabled behind the cache's back
            self.cache.evict(scope.alias());
        }

        if let Some(stored) = self.repository.find_active(scope).await? {
            let handle = self.load_stored(&stored).await?;
            self.cache.put_aliased(scope.alias(), handle.clone());
            return Ok(handle);
        }

        self.generate(scope).await
    }

    /// Loads a key by id for verification.
    ///
    /// Expiring keys load normally so tokens issued before a rotation keep
    /// verifying; Disabled keys are rejected even on a cache hit.
    pub async fn load_key(&self, kid: &str) -> Result<KeyHandle, AuthError> {
        if let Some(handle) = self.cache.get(kid) {
            if handle.status == KeyStatus::Disabled {
                return Err(AuthError::key_disabled(kid));
            }
            return Ok(handle);
        }

        let stored = self
            .repository
            .get(kid)
            .await?
            .ok_or_else(|| AuthError::key_not_found(kid))?;
        if stored.status == KeyStatus::Disabled {
            return Err(AuthError::key_disabled(kid));
        }

        let handle = self.load_stored(&stored).await?;
        self.cache.put(kid, handle.clone());
        debug!(kid, scope = %stored.scope, "Key loaded into cache");
        Ok(handle)
    }

    /// Rotates the Active key for `scope`: a fresh key becomes Active and
    /// the previous one flips to Expiring so outstanding tokens still
    /// verify.
    pub async fn rotate(&self, scope: KeyScope) -> Result<KeyHandle, AuthError> {
        let previous = self.repository.find_active(scope).await?;
        let handle = self.generate(scope).await?;

        if let Some(previous) = previous {
            self.repository
                .set_status(&previous.id, KeyStatus::Expiring)
                .await?;
            self.cache.evict(&previous.id);
            info!(scope = %scope, retired = %previous.id, active = %handle.id, "Key rotated");
        }
        Ok(handle)
    }

    /// Marks a key Disabled and evicts it everywhere. Tokens issued under
    /// it stop verifying immediately and issuance moves off it at once.
    pub async fn disable(&self, kid: &str) -> Result<(), AuthError> {
        let stored = self
            .repository
            .get(kid)
            .await?
            .ok_or_else(|| AuthError::key_not_found(kid))?;
        self.repository.set_status(kid, KeyStatus::Disabled).await?;
        self.cache.evict(kid);
        // the scope alias caches the same handle for issuance; its status
        // field is a load-time snapshot, so it must go too
        if self
            .cache
            .get(stored.scope.alias())
            .is_some_and(|handle| handle.id == kid)
        {
            self.cache.evict(stored.scope.alias());
        }
        warn!(kid, "Key disabled");
        Ok(())
    }

    /// Returns the published key set: the Active signing-scope key.
    pub async fn jwks(&self) -> Result<JwkSet, AuthError> {
        let handle = self.ensure_active_key(KeyScope::Signing).await?;
        Ok(JwkSet {
            keys: vec![handle.to_jwk()],
        })
    }

    /// Returns the Active signing-scope key as a single JWK.
    pub async fn active_jwk(&self) -> Result<Jwk, AuthError> {
        let handle = self.ensure_active_key(KeyScope::Signing).await?;
        Ok(handle.to_jwk())
    }

    async fn generate(&self, scope: KeyScope) -> Result<KeyHandle, AuthError> {
        let id = fidovault_core::generate_id();
        let handle = KeyHandle::generate(id, scope, fidovault_core::unix_now());
        let (private_der, public_pem) = handle.export()?;
        let wrapped_private = self.wrapper.wrap(&private_der).await?;

        self.repository
            .insert(StoredKey {
                id: handle.id.clone(),
                scope,
                status: KeyStatus::Active,
                wrapped_private,
                public_pem,
                created_at: handle.created_at,
            })
            .await?;
        self.cache.put_aliased(scope.alias(), handle.clone());
        info!(kid = %handle.id, scope = %scope, "Generated signing key");
        Ok(handle)
    }

    async fn load_stored(&self, stored: &StoredKey) -> Result<KeyHandle, AuthError> {
        let private_der = self.wrapper.unwrap(&stored.wrapped_private).await?;
        KeyHandle::from_stored(stored, &private_der)
    }
}

impl std::fmt::Debug for Keystore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keystore")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// Builds a keystore over in-memory storage with pass-through wrapping.
/// Intended for tests and single-node development setups.
#[must_use]
pub fn in_memory_keystore(cache_ttl: Duration) -> Keystore {
    Keystore::new(
        Arc::new(crate::keystore::store::MemoryKeyRepository::new()),
        Arc::new(crate::keystore::kms::PlainWrapper),
        cache_ttl,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::kms::{KeyWrapper, PlainWrapper};
    use crate::keystore::store::{KeyRepository, MemoryKeyRepository};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn keystore() -> Keystore {
        in_memory_keystore(Duration::from_secs(600))
    }

    #[tokio::test]
    async fn test_ensure_generates_on_first_use() {
        let ks = keystore();
        let key = ks.ensure_active_key(KeyScope::Signing).await.unwrap();
        assert_eq!(key.status, KeyStatus::Active);
        assert_eq!(key.scope, KeyScope::Signing);

        // second call returns the same key, not a fresh one
        let again = ks.ensure_active_key(KeyScope::Signing).await.unwrap();
        assert_eq!(again.id, key.id);

        // scopes are independent
        let session = ks.ensure_active_key(KeyScope::Session).await.unwrap();
        assert_ne!(session.id, key.id);
    }

    #[tokio::test]
    async fn test_load_by_id() {
        let ks = keystore();
        let key = ks.ensure_active_key(KeyScope::Session).await.unwrap();
        let loaded = ks.load_key(&key.id).await.unwrap();
        assert_eq!(loaded.id, key.id);

        let err = ks.load_key("nope").await.unwrap_err();
        assert!(matches!(err, AuthError::KeyNotFound { .. }));
    }

    #[tokio::test]
    async fn test_rotation_keeps_old_key_verifying() {
        let ks = keystore();
        let old = ks.ensure_active_key(KeyScope::Signing).await.unwrap();
        let new = ks.rotate(KeyScope::Signing).await.unwrap();
        assert_ne!(old.id, new.id);

        // issuance now uses the new key
        let active = ks.ensure_active_key(KeyScope::Signing).await.unwrap();
        assert_eq!(active.id, new.id);

        // the retired key still loads for verification
        let retired = ks.load_key(&old.id).await.unwrap();
        assert_eq!(retired.status, KeyStatus::Expiring);
    }

    #[tokio::test]
    async fn test_disabled_key_rejected_even_when_cached() {
        let ks = keystore();
        let key = ks.ensure_active_key(KeyScope::Signing).await.unwrap();
        // warm the cache under the key id
        ks.load_key(&key.id).await.unwrap();

        ks.disable(&key.id).await.unwrap();
        let err = ks.load_key(&key.id).await.unwrap_err();
        assert!(matches!(err, AuthError::KeyDisabled { .. }));
    }

    #[tokio::test]
    async fn test_disable_clears_the_issuance_alias() {
        let ks = keystore();
        // ensure_active_key caches under the scope alias too
        let first = ks.ensure_active_key(KeyScope::Session).await.unwrap();
        ks.disable(&first.id).await.unwrap();

        // issuance must move off the disabled key immediately, not after
        // the cache idle window
        let replacement = ks.ensure_active_key(KeyScope::Session).await.unwrap();
        assert_ne!(replacement.id, first.id);
        assert_eq!(replacement.status, KeyStatus::Active);

        let err = ks.load_key(&first.id).await.unwrap_err();
        assert!(matches!(err, AuthError::KeyDisabled { .. }));
    }

    #[tokio::test]
    async fn test_disable_after_rotation_keeps_the_active_alias() {
        let ks = keystore();
        let old = ks.ensure_active_key(KeyScope::Signing).await.unwrap();
        let new = ks.rotate(KeyScope::Signing).await.unwrap();

        // disabling the retired key must not disturb the active one
        ks.disable(&old.id).await.unwrap();
        let active = ks.ensure_active_key(KeyScope::Signing).await.unwrap();
        assert_eq!(active.id, new.id);
    }

    #[tokio::test]
    async fn test_corrupt_material_not_replaced() {
        let repo = Arc::new(MemoryKeyRepository::new());
        let ks = Keystore::new(repo.clone(), Arc::new(PlainWrapper), Duration::from_secs(600));
        let key = ks.ensure_active_key(KeyScope::Signing).await.unwrap();

        // corrupt the stored record
        let mut stored = repo.get(&key.id).await.unwrap().unwrap();
        stored.wrapped_private = vec![0u8; 7];
        repo.insert(stored).await.unwrap();

        // fresh keystore, cold cache
        let ks = Keystore::new(repo.clone(), Arc::new(PlainWrapper), Duration::from_secs(600));
        let err = ks.load_key(&key.id).await.unwrap_err();
        assert!(matches!(err, AuthError::CorruptKey { .. }));

        // issuance surfaces the corruption too instead of minting a
        // replacement that would orphan outstanding tokens
        let err = ks.ensure_active_key(KeyScope::Signing).await.unwrap_err();
        assert!(matches!(err, AuthError::CorruptKey { .. }));
    }

    struct CountingWrapper(AtomicUsize);

    #[async_trait]
    impl KeyWrapper for CountingWrapper {
        async fn wrap(&self, plaintext: &[u8]) -> Result<Vec<u8>, AuthError> {
            Ok(plaintext.to_vec())
        }
        async fn unwrap(&self, wrapped: &[u8]) -> Result<Vec<u8>, AuthError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(wrapped.to_vec())
        }
    }

    #[tokio::test]
    async fn test_cache_avoids_unwrap_roundtrips() {
        let wrapper = Arc::new(CountingWrapper(AtomicUsize::new(0)));
        let ks = Keystore::new(
            Arc::new(MemoryKeyRepository::new()),
            wrapper.clone(),
            Duration::from_secs(600),
        );
        let key = ks.ensure_active_key(KeyScope::Signing).await.unwrap();
        for _ in 0..5 {
            ks.load_key(&key.id).await.unwrap();
        }
        // generation caches the handle directly, so no unwrap happened
        assert_eq!(wrapper.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_jwks_exposes_signing_scope_only() {
        let ks = keystore();
        ks.ensure_active_key(KeyScope::Session).await.unwrap();
        let signing = ks.ensure_active_key(KeyScope::Signing).await.unwrap();

        let jwks = ks.jwks().await.unwrap();
        assert_eq!(jwks.keys.len(), 1);
        assert_eq!(jwks.keys[0].kid, signing.id);
        assert_eq!(jwks.keys[0].crv, "P-256");
    }
}
