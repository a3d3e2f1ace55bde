//! Token issuance and verification.
//!
//! The issuer signs a typed claim set under the Active key of the scope the
//! claim type is bound to, and verifies against the key id embedded in the
//! token header. A token issued before a rotation keeps verifying until its
//! key is disabled; no token is ever re-signed with a different key.

use std::sync::Arc;

use tracing::debug;

use crate::error::AuthError;
use crate::keystore::Keystore;
use crate::token::claims::ClaimSet;
use crate::token::compact::{self, Header};

/// Signs and verifies typed claim sets.
#[derive(Clone)]
pub struct TokenIssuer {
    keystore: Arc<Keystore>,
}

impl TokenIssuer {
    /// Creates an issuer over the given keystore.
    #[must_use]
    pub fn new(keystore: Arc<Keystore>) -> Self {
        Self { keystore }
    }

    /// Shared keystore handle, for callers that also serve JWKS.
    #[must_use]
    pub fn keystore(&self) -> &Arc<Keystore> {
        &self.keystore
    }

    /// Signs `claims` under the Active key of the claim type's scope.
    pub async fn sign<C: ClaimSet>(&self, claims: &C) -> Result<String, AuthError> {
        let key = self.keystore.ensure_active_key(C::SCOPE).await?;
        let payload = serde_json::to_vec(claims)
            .map_err(|e| AuthError::internal(format!("claim serialization failed: {e}")))?;
        let token = compact::encode(&Header::es256(&key.id), &payload, |input| key.sign(input))?;
        debug!(kid = %key.id, scope = %C::SCOPE, "Token signed");
        Ok(token)
    }

    /// Verifies a compact token and deserializes it into the expected
    /// claim variant.
    ///
    /// The key named by the header `kid` must exist, must not be Disabled,
    /// and must belong to the scope the claim type is bound to. Purpose
    /// checks beyond that (freshness, expected email or subject) are the
    /// caller's.
    pub async fn verify<C: ClaimSet>(&self, token: &str) -> Result<C, AuthError> {
        let parsed = compact::decode(token)?;
        let key = self.keystore.load_key(&parsed.header.kid).await?;
        if key.scope != C::SCOPE {
            return Err(AuthError::claim_mismatch("key scope does not match claim type"));
        }
        key.verify(parsed.signing_input.as_bytes(), &parsed.signature)?;
        serde_json::from_slice(&parsed.payload)
            .map_err(|_| AuthError::claim_mismatch("payload does not match claim schema"))
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}
