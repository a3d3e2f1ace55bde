//! Identifier generation.
//!
//! Two flavours are used across the system: uuid v4 for database record ids
//! (signing keys, apps) and raw random bytes encoded as unpadded base64url
//! for values that travel in URLs or form bodies (session ids, authorization
//! codes). The opaque form carries at least 128 bits of entropy so the ids
//! are not guessable.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

/// Generates a uuid v4 record identifier.
#[must_use]
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generates `bytes` random bytes and encodes them as unpadded base64url.
///
/// Callers must ask for at least 16 bytes (128 bits); session ids and
/// authorization codes use 32.
#[must_use]
pub fn generate_opaque(bytes: usize) -> String {
    debug_assert!(bytes >= 16, "opaque ids need at least 128 bits of entropy");
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}
