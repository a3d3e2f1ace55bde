//! Email verification service.
//!
//! Minting and confirming email-validation tokens, and the pub/sub bridge
//! between the link-click handler and a waiting connection. The click
//! handler republishes the raw token on the channel named by the token's
//! own `session` claim; that channel is the only coupling between the two
//! sides.

use std::time::Duration;

use tracing::{debug, info};

use fidovault_core::SessionChannels;

use crate::error::AuthError;
use crate::oauth::AuthorizationFlow;
use crate::storage::DynUserDirectory;
use crate::token::{EmailValidationClaims, TokenIssuer};

/// Purpose value that completes a session and mints an ID token.
pub const PURPOSE_LOGIN: &str = "login";

/// Mints, confirms and correlates email-validation tokens.
#[derive(Clone)]
pub struct EmailVerification {
    issuer: TokenIssuer,
    flow: AuthorizationFlow,
    users: DynUserDirectory,
    channels: SessionChannels,
    freshness: Duration,
}

impl EmailVerification {
    /// Creates the service. `freshness` bounds how old a validation
    /// token's `iat` may be when checked.
    #[must_use]
    pub fn new(
        issuer: TokenIssuer,
        flow: AuthorizationFlow,
        users: DynUserDirectory,
        channels: SessionChannels,
        freshness: Duration,
    ) -> Self {
        Self {
            issuer,
            flow,
            users,
            channels,
            freshness,
        }
    }

    /// Pub/sub registry handle, shared with the connection driver.
    #[must_use]
    pub fn channels(&self) -> &SessionChannels {
        &self.channels
    }

    /// Flow controller handle.
    #[must_use]
    pub fn flow_handle(&self) -> &AuthorizationFlow {
        &self.flow
    }

    /// Token issuer handle.
    #[must_use]
    pub fn issuer_handle(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Freshness window for validation tokens.
    #[must_use]
    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    /// Mints a validation token for an email to be delivered out of band.
    pub async fn request_verification(
        &self,
        session_id: &str,
        email: &str,
        purpose: &str,
    ) -> Result<String, AuthError> {
        let token = self
            .issuer
            .sign(&EmailValidationClaims {
                email: email.to_string(),
                purpose: purpose.to_string(),
                iat: fidovault_core::unix_now(),
                session: session_id.to_string(),
            })
            .await?;
        info!(purpose, "Email validation token minted");
        Ok(token)
    }

    /// Starts a verification for an email address. Reuses the caller's
    /// session id when given, otherwise mints a fresh one so the token and
    /// a later connection share a correlation topic. Returns the session id
    /// and the validation token to be delivered out of band.
    pub async fn send_session(
        &self,
        email: &str,
        purpose: &str,
        session_id: Option<&str>,
    ) -> Result<(String, String), AuthError> {
        let session_id = match session_id {
            Some(id) => id.to_string(),
            None => fidovault_core::generate_opaque(32),
        };
        let token = self
            .request_verification(&session_id, email, purpose)
            .await?;
        Ok((session_id, token))
    }

    /// Handles the link click: verifies the raw token and republishes it on
    /// the channel named by its own `session` claim.
    ///
    /// Publishing to a session nobody is waiting on is not an error; the
    /// click simply has no connection to wake.
    pub async fn confirm_click(&self, raw_token: &str) -> Result<(), AuthError> {
        let claims: EmailValidationClaims = self.issuer.verify(raw_token).await?;
        if fidovault_core::is_stale(claims.iat, self.freshness) {
            return Err(AuthError::claim_mismatch("validation token is stale"));
        }
        let delivered = self.channels.publish(&claims.session, raw_token);
        debug!(purpose = %claims.purpose, delivered, "Validation token republished");
        Ok(())
    }

    /// Handles one token received on a connection's channel.
    ///
    /// Re-verifies the token against the connection's session and the
    /// email the client asked about. For `login` the session is completed
    /// and the minted ID token returned; for any other purpose the raw
    /// token is relayed unmodified.
    pub async fn handle_published(
        &self,
        session_id: &str,
        expected_email: &str,
        raw_token: &str,
    ) -> Result<String, AuthError> {
        let claims: EmailValidationClaims = self.issuer.verify(raw_token).await?;
        claims.check(session_id, expected_email, self.freshness)?;

        if claims.purpose != PURPOSE_LOGIN {
            return Ok(raw_token.to_string());
        }

        let user = self
            .users
            .find_by_email(&claims.email)
            .await?
            .ok_or_else(|| AuthError::claim_mismatch("no user for verified email"))?;
        let record = self
            .flow
            .complete_authentication(session_id, &user.id, "", vec!["email".to_string()])
            .await?;
        let bearer = record
            .bearer_token
            .ok_or_else(|| AuthError::internal("completed session has no bearer token"))?;
        info!("Email login completed");
        Ok(bearer)
    }
}

impl std::fmt::Debug for EmailVerification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailVerification")
            .field("freshness", &self.freshness)
            .finish_non_exhaustive()
    }
}
