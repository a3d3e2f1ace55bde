//! PKCE (RFC 7636) challenge handling.
//!
//! Only the `S256` method is supported; `plain` is rejected outright. The
//! derived index key couples a client id to the challenge so the stored
//! session can only be resolved by whoever holds the original verifier.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

use crate::error::AuthError;

/// The only accepted `code_challenge_method`.
pub const METHOD_S256: &str = "S256";

/// Computes `base64url(SHA-256(verifier))`, unpadded.
#[must_use]
pub fn challenge_from_verifier(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Rejects any challenge method other than `S256`.
pub fn require_s256(method: &str) -> Result<(), AuthError> {
    if method == METHOD_S256 {
        Ok(())
    } else {
        Err(AuthError::invalid_request(
            "code_challenge_method must be S256",
        ))
    }
}

/// Builds the derived index key under which the session id is stored.
#[must_use]
pub fn derived_index_key(client_id: &str, challenge: &str) -> String {
    format!("{client_id}/{challenge}")
}
