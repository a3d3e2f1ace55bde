//! Signing key types.
//!
//! Keys are ES256 (ECDSA over P-256 with SHA-256). A key belongs to exactly
//! one scope and moves through `Active -> Expiring -> Disabled`; records are
//! never mutated in place beyond the status flip performed by rotation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Logical scope a signing key serves.
///
/// Session-scope keys sign short-lived operational tokens (email validation,
/// dashboard sessions); signing-scope keys sign tokens presented to third
/// parties (ID tokens) and are the ones published through the JWKS endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyScope {
    /// Short-lived operational tokens.
    Session,
    /// Tokens verified by external parties.
    Signing,
}

impl KeyScope {
    /// Well-known cache alias for this scope. The Active key is always
    /// reachable under this alias in addition to its own id.
    #[must_use]
    pub fn alias(&self) -> &'static str {
        match self {
            Self::Session => "SESSION",
            Self::Signing => "SIGN",
        }
    }
}

impl std::fmt::Display for KeyScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.alias())
    }
}

/// Lifecycle status of a signing key.
///
/// Only the Active key signs new tokens. Expiring keys still verify tokens
/// issued before rotation. Disabled keys are dead for both operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyStatus {
    /// Signs new tokens and verifies.
    Active,
    /// Verification only; superseded by a newer Active key.
    Expiring,
    /// Must not sign or verify anything.
    Disabled,
}

/// Persisted form of a signing key.
///
/// The private half is stored wrapped (see [`crate::keystore::kms`]); the
/// public half is kept as PEM so JWKS export never needs an unwrap call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredKey {
    /// Unique key id, embedded in token headers as `kid`.
    pub id: String,
    /// Scope this key serves.
    pub scope: KeyScope,
    /// Lifecycle status.
    pub status: KeyStatus,
    /// Wrapped PKCS#8 DER private key material.
    pub wrapped_private: Vec<u8>,
    /// SPKI PEM public key.
    pub public_pem: String,
    /// Unix timestamp (seconds) of creation.
    pub created_at: i64,
}

/// A loaded, usable signing key with parsed material.
#[derive(Clone)]
pub struct KeyHandle {
    /// Unique key id.
    pub id: String,
    /// Scope this key serves.
    pub scope: KeyScope,
    /// Lifecycle status at load time.
    pub status: KeyStatus,
    /// Unix timestamp (seconds) of creation.
    pub created_at: i64,
    signing: SigningKey,
    verifying: VerifyingKey,
}

impl std::fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // private material never appears in debug output
        f.debug_struct("KeyHandle")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("status", &self.status)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl KeyHandle {
    /// Generates a fresh P-256 key pair for `scope` with the given id.
    #[must_use]
    pub fn generate(id: String, scope: KeyScope, created_at: i64) -> Self {
        let signing = SigningKey::random(&mut rand::thread_rng());
        let verifying = *signing.verifying_key();
        Self {
            id,
            scope,
            status: KeyStatus::Active,
            created_at,
            signing,
            verifying,
        }
    }

    /// Reconstructs a handle from a stored record and its unwrapped
    /// PKCS#8 DER private material.
    ///
    /// Malformed material is a corruption error; callers must surface it
    /// rather than fall back to generating a replacement key.
    pub fn from_stored(stored: &StoredKey, private_der: &[u8]) -> Result<Self, AuthError> {
        let signing = SigningKey::from_pkcs8_der(private_der)
            .map_err(|_| AuthError::corrupt_key(&stored.id))?;
        let verifying = VerifyingKey::from_public_key_pem(&stored.public_pem)
            .map_err(|_| AuthError::corrupt_key(&stored.id))?;
        Ok(Self {
            id: stored.id.clone(),
            scope: stored.scope,
            status: stored.status,
            created_at: stored.created_at,
            signing,
            verifying,
        })
    }

    /// Exports the private half as PKCS#8 DER for wrapping, and the public
    /// half as SPKI PEM.
    pub fn export(&self) -> Result<(Vec<u8>, String), AuthError> {
        let private_der = self
            .signing
            .to_pkcs8_der()
            .map_err(|e| AuthError::internal(format!("private key encoding failed: {e}")))?;
        let public_pem = self
            .verifying
            .to_public_key_pem(p256::pkcs8::LineEnding::LF)
            .map_err(|e| AuthError::internal(format!("public key encoding failed: {e}")))?;
        Ok((private_der.as_bytes().to_vec(), public_pem))
    }

    /// Signs `message` with ECDSA P-256 over SHA-256, returning the raw
    /// 64-byte `r || s` signature.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing.sign(message);
        signature.to_bytes().to_vec()
    }

    /// Verifies a raw `r || s` signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), AuthError> {
        let signature =
            Signature::from_slice(signature).map_err(|_| AuthError::SignatureInvalid)?;
        self.verifying
            .verify(message, &signature)
            .map_err(|_| AuthError::SignatureInvalid)
    }

    /// Renders the public half as a JWK.
    #[must_use]
    pub fn to_jwk(&self) -> Jwk {
        let point = self.verifying.to_encoded_point(false);
        // uncompressed SEC1 points always carry both coordinates
        let x = point.x().map(|b| URL_SAFE_NO_PAD.encode(b)).unwrap_or_default();
        let y = point.y().map(|b| URL_SAFE_NO_PAD.encode(b)).unwrap_or_default();
        Jwk {
            kid: self.id.clone(),
            kty: "EC".to_string(),
            crv: "P-256".to_string(),
            x,
            y,
        }
    }
}

/// Public key in JWK form for third-party verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key id matching the `kid` token header.
    pub kid: String,
    /// Key type, always `"EC"`.
    pub kty: String,
    /// Curve, always `"P-256"`.
    pub crv: String,
    /// Base64url x coordinate.
    pub x: String,
    /// Base64url y coordinate.
    pub y: String,
}

/// JWKS document returned by the public key endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwkSet {
    /// Published keys.
    pub keys: Vec<Jwk>,
}
