//! Authentication and token-issuance error types.
//!
//! Internal causes carry full context for logging; what reaches a caller is
//! the minimal message needed to decide between retrying and restarting the
//! flow. Rejection paths in the OIDC exchange deliberately collapse to the
//! same generic response so error shape cannot be used as an oracle against
//! PKCE or signature checks.

use std::fmt;

/// Errors that can occur during key lifecycle, token issuance and session
/// correlation operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No key exists for the requested id or scope. Recoverable for
    /// issuance (triggers on-demand generation), fatal for verification.
    #[error("Key not found: {kid}")]
    KeyNotFound {
        /// The key id or scope alias that was not found.
        kid: String,
    },

    /// The key exists but is Disabled and must not verify or sign anything.
    #[error("Key disabled: {kid}")]
    KeyDisabled {
        /// The disabled key's id.
        kid: String,
    },

    /// Stored key material could not be parsed. Never silently recovered by
    /// regenerating - that would invalidate all outstanding tokens.
    #[error("Corrupt key material: {kid}")]
    CorruptKey {
        /// The key whose material is unreadable.
        kid: String,
    },

    /// The external key-management service failed. Fatal for the specific
    /// operation only.
    #[error("Key management service failure: {message}")]
    UpstreamKms {
        /// Description of the KMS failure.
        message: String,
    },

    /// A token's signature did not verify.
    #[error("Invalid token signature")]
    SignatureInvalid,

    /// A token verified but its claims do not match what the caller
    /// expected (wrong scope, wrong email/session, stale issued-at).
    #[error("Claim mismatch: {message}")]
    ClaimMismatch {
        /// Description of the mismatch.
        message: String,
    },

    /// A token could not be parsed as a compact three-part string.
    #[error("Malformed token: {message}")]
    MalformedToken {
        /// Description of the parse failure.
        message: String,
    },

    /// The session record is missing or expired; the caller must restart
    /// the flow from authorization.
    #[error("Session not found")]
    SessionNotFound,

    /// A single-use exchange was retried.
    #[error("Replay detected")]
    ReplayDetected,

    /// The authorization request is invalid or malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// The calling app is unknown or not permitted for the given origin.
    #[error("Invalid app: {message}")]
    InvalidApp {
        /// Description of why the app is invalid.
        message: String,
    },

    /// An error occurred while storing or retrieving auth data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `KeyNotFound` error.
    #[must_use]
    pub fn key_not_found(kid: impl Into<String>) -> Self {
        Self::KeyNotFound { kid: kid.into() }
    }

    /// Creates a new `KeyDisabled` error.
    #[must_use]
    pub fn key_disabled(kid: impl Into<String>) -> Self {
        Self::KeyDisabled { kid: kid.into() }
    }

    /// Creates a new `CorruptKey` error.
    #[must_use]
    pub fn corrupt_key(kid: impl Into<String>) -> Self {
        Self::CorruptKey { kid: kid.into() }
    }

    /// Creates a new `UpstreamKms` error.
    #[must_use]
    pub fn upstream_kms(message: impl Into<String>) -> Self {
        Self::UpstreamKms {
            message: message.into(),
        }
    }

    /// Creates a new `ClaimMismatch` error.
    #[must_use]
    pub fn claim_mismatch(message: impl Into<String>) -> Self {
        Self::ClaimMismatch {
            message: message.into(),
        }
    }

    /// Creates a new `MalformedToken` error.
    #[must_use]
    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::MalformedToken {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidApp` error.
    #[must_use]
    pub fn invalid_app(message: impl Into<String>) -> Self {
        Self::InvalidApp {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if retrying the same call could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamKms { .. } | Self::Storage { .. })
    }

    /// Returns `true` if the caller must restart the flow from
    /// authorization rather than retry.
    #[must_use]
    pub fn requires_restart(&self) -> bool {
        matches!(self, Self::SessionNotFound | Self::ReplayDetected)
    }

    /// Returns `true` if this is a key-lifecycle error.
    #[must_use]
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            Self::KeyNotFound { .. }
                | Self::KeyDisabled { .. }
                | Self::CorruptKey { .. }
                | Self::UpstreamKms { .. }
        )
    }

    /// Returns `true` if this is a token-verification failure.
    #[must_use]
    pub fn is_verification_error(&self) -> bool {
        matches!(
            self,
            Self::SignatureInvalid | Self::ClaimMismatch { .. } | Self::MalformedToken { .. }
        )
    }

    /// Returns the error category for logging and monitoring.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::KeyNotFound { .. }
            | Self::KeyDisabled { .. }
            | Self::CorruptKey { .. }
            | Self::UpstreamKms { .. } => ErrorCategory::KeyLifecycle,
            Self::SignatureInvalid | Self::ClaimMismatch { .. } | Self::MalformedToken { .. } => {
                ErrorCategory::Verification
            }
            Self::SessionNotFound | Self::ReplayDetected => ErrorCategory::Session,
            Self::InvalidRequest { .. } | Self::InvalidApp { .. } => ErrorCategory::Validation,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the OAuth 2.0 error code used in the OIDC error response.
    ///
    /// Every client-caused rejection maps to `invalid_request` on purpose:
    /// the exchange endpoint must not differentiate "session expired" from
    /// "wrong verifier" in what it sends back.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::UpstreamKms { .. } | Self::Storage { .. } | Self::Internal { .. } => {
                "server_error"
            }
            _ => "invalid_request",
        }
    }
}

impl From<fidovault_storage::StorageError> for AuthError {
    fn from(err: fidovault_storage::StorageError) -> Self {
        Self::storage(err.to_string())
    }
}

/// Categories of auth errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Key generation, rotation, wrap/unwrap and lookup.
    KeyLifecycle,
    /// Token signature and claim verification.
    Verification,
    /// Session lookup and exchange state.
    Session,
    /// Request validation.
    Validation,
    /// Storage and other infrastructure failures.
    Infrastructure,
    /// Unexpected internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyLifecycle => write!(f, "key_lifecycle"),
            Self::Verification => write!(f, "verification"),
            Self::Session => write!(f, "session"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::key_not_found("SIGN");
        assert_eq!(err.to_string(), "Key not found: SIGN");

        let err = AuthError::claim_mismatch("email does not match");
        assert_eq!(err.to_string(), "Claim mismatch: email does not match");

        let err = AuthError::SessionNotFound;
        assert_eq!(err.to_string(), "Session not found");
    }

    #[test]
    fn test_error_predicates() {
        assert!(AuthError::upstream_kms("timeout").is_retryable());
        assert!(!AuthError::SignatureInvalid.is_retryable());

        assert!(AuthError::SessionNotFound.requires_restart());
        assert!(AuthError::ReplayDetected.requires_restart());
        assert!(!AuthError::storage("down").requires_restart());

        assert!(AuthError::corrupt_key("k1").is_key_error());
        assert!(AuthError::SignatureInvalid.is_verification_error());
        assert!(!AuthError::SignatureInvalid.is_key_error());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthError::key_disabled("k").category(),
            ErrorCategory::KeyLifecycle
        );
        assert_eq!(
            AuthError::SignatureInvalid.category(),
            ErrorCategory::Verification
        );
        assert_eq!(
            AuthError::ReplayDetected.category(),
            ErrorCategory::Session
        );
        assert_eq!(
            AuthError::storage("x").category(),
            ErrorCategory::Infrastructure
        );
    }

    #[test]
    fn test_oauth_error_code_is_opaque() {
        // rejection paths must all look the same to the caller
        assert_eq!(AuthError::SessionNotFound.oauth_error_code(), "invalid_request");
        assert_eq!(AuthError::ReplayDetected.oauth_error_code(), "invalid_request");
        assert_eq!(AuthError::SignatureInvalid.oauth_error_code(), "invalid_request");
        assert_eq!(
            AuthError::invalid_request("bad").oauth_error_code(),
            "invalid_request"
        );
        assert_eq!(AuthError::storage("down").oauth_error_code(), "server_error");
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::KeyLifecycle.to_string(), "key_lifecycle");
        assert_eq!(ErrorCategory::Verification.to_string(), "verification");
    }
}
