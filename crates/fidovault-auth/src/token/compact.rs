//! Compact token encoding.
//!
//! Tokens are three unpadded base64url segments,
//! `header.payload.signature`. The header is `{alg: "ES256", kid}`; the
//! signature is raw 64-byte `r || s` ECDSA P-256 over SHA-256 of the
//! `header.payload` prefix.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Algorithm identifier carried in every header.
pub const ALG_ES256: &str = "ES256";

/// Token header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Signature algorithm, always `"ES256"`.
    pub alg: String,
    /// Id of the signing key.
    pub kid: String,
}

impl Header {
    /// Creates an ES256 header for the given key id.
    #[must_use]
    pub fn es256(kid: impl Into<String>) -> Self {
        Self {
            alg: ALG_ES256.to_string(),
            kid: kid.into(),
        }
    }
}

/// A parsed but not yet verified token.
///
/// `signing_input` is the exact `header.payload` prefix the signature
/// covers; verification must run over these bytes, not a re-serialization.
#[derive(Debug)]
pub struct ParsedToken {
    /// Decoded header.
    pub header: Header,
    /// Decoded payload bytes (JSON).
    pub payload: Vec<u8>,
    /// Decoded raw signature.
    pub signature: Vec<u8>,
    /// The `header.payload` prefix as signed.
    pub signing_input: String,
}

/// Assembles a compact token from serialized payload bytes.
pub fn encode(header: &Header, payload: &[u8], sign: impl FnOnce(&[u8]) -> Vec<u8>) -> Result<String, AuthError> {
    let header_json = serde_json::to_vec(header)
        .map_err(|e| AuthError::internal(format!("header serialization failed: {e}")))?;
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(payload)
    );
    let signature = sign(signing_input.as_bytes());
    Ok(format!(
        "{signing_input}.{}",
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// Splits and decodes a compact token without verifying it.
pub fn decode(token: &str) -> Result<ParsedToken, AuthError> {
    let mut parts = token.split('.');
    let (Some(h), Some(p), Some(s), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::malformed_token("expected three segments"));
    };

    let header_bytes = URL_SAFE_NO_PAD
        .decode(h)
        .map_err(|_| AuthError::malformed_token("header is not base64url"))?;
    let header: Header = serde_json::from_slice(&header_bytes)
        .map_err(|_| AuthError::malformed_token("header is not valid JSON"))?;
    if header.alg != ALG_ES256 {
        return Err(AuthError::malformed_token("unsupported algorithm"));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(p)
        .map_err(|_| AuthError::malformed_token("payload is not base64url"))?;
    let signature = URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|_| AuthError::malformed_token("signature is not base64url"))?;

    Ok(ParsedToken {
        header,
        payload,
        signature,
        signing_input: format!("{h}.{p}"),
    })
}
