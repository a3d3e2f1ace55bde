//! Typed claim variants.
//!
//! Each token purpose has a fixed schema bound at compile time to the key
//! scope that signs it, so verification is exhaustive instead of guessing
//! at string-keyed maps.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::keystore::KeyScope;

/// A signed payload schema bound to the key scope that signs it.
pub trait ClaimSet: Serialize + DeserializeOwned + Send + Sync {
    /// Scope of the key that signs and verifies this variant.
    const SCOPE: KeyScope;
}

/// Claims carried by an email-validation token.
///
/// Minted when a verification email is sent; republished on the session's
/// pub/sub channel when the recipient clicks the link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailValidationClaims {
    /// Address the token validates.
    pub email: String,
    /// Verification purpose, e.g. `"login"` or `"add_email"`.
    #[serde(rename = "type")]
    pub purpose: String,
    /// Unix timestamp (seconds) of issuance.
    pub iat: i64,
    /// Session id the verification belongs to.
    pub session: String,
}

impl ClaimSet for EmailValidationClaims {
    const SCOPE: KeyScope = KeyScope::Session;
}

impl EmailValidationClaims {
    /// Checks this token against the expectations of the receiving
    /// connection: the session it was issued for, the email the client
    /// asked to verify, and the freshness window.
    pub fn check(
        &self,
        expected_session: &str,
        expected_email: &str,
        freshness: Duration,
    ) -> Result<(), AuthError> {
        if self.session != expected_session {
            return Err(AuthError::claim_mismatch("session does not match"));
        }
        if self.email != expected_email {
            return Err(AuthError::claim_mismatch("email does not match"));
        }
        if fidovault_core::is_stale(self.iat, freshness) {
            return Err(AuthError::claim_mismatch("validation token is stale"));
        }
        Ok(())
    }
}

/// Claims carried by an ID token handed to an OIDC relying party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Client (app) id the token was issued for.
    pub client: String,
    /// Nonce echoed from the authorization request.
    pub nonce: String,
    /// Subject: the authenticated user's id.
    pub sub: String,
    /// Unix timestamp (seconds) of issuance.
    pub iat: i64,
    /// Authentication methods the subject passed.
    pub passes: Vec<String>,
}

impl ClaimSet for IdTokenClaims {
    const SCOPE: KeyScope = KeyScope::Signing;
}

/// Claims carried by a dashboard session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSessionClaims {
    /// Subject: the account owner's identifier.
    pub sub: String,
    /// FIDO credential id backing the session.
    pub fid: String,
    /// Internal user id.
    pub uid: String,
    /// Granted dashboard scopes.
    pub scopes: Vec<String>,
    /// Unix timestamp (seconds) of issuance.
    pub iat: i64,
}

impl ClaimSet for DashboardSessionClaims {
    const SCOPE: KeyScope = KeyScope::Session;
}
