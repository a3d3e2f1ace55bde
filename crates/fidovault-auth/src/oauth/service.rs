//! Authorization-code + PKCE flow controller.
//!
//! One flow runs `Started -> Authenticated -> Exchanged`. Authorization
//! creates a session holding the PKCE challenge; authentication completion
//! attaches the user, mints the bearer token and writes the derived index;
//! the exchange consumes the index atomically, so a replayed exchange
//! resolves nothing.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::AuthError;
use crate::oauth::pkce;
use crate::oauth::session::{SessionRecord, SessionStore};
use crate::storage::{App, DynAppDirectory, DynConsentStorage};
use crate::token::{IdTokenClaims, TokenIssuer};

/// Parameters of an authorization request.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Client id, if the caller knows it. Absent for origin-resolved apps.
    pub client_id: Option<String>,
    /// Origin of the front-channel request.
    pub origin: String,
    /// Client IP recorded for the session.
    pub client_ip: String,
    /// Redirect URI the relying party supplied.
    pub redirect_uri: String,
    /// PKCE code challenge.
    pub code_challenge: String,
    /// PKCE challenge method; must be `S256`.
    pub code_challenge_method: String,
    /// Opaque state echoed back to the relying party.
    pub state: String,
}

/// Outcome of a started authorization flow.
#[derive(Debug, Clone)]
pub struct AuthorizationStarted {
    /// Handle for the remote authentication surface. Not the PKCE lookup
    /// key; knowing it does not allow an exchange.
    pub session_id: String,
    /// App the flow was resolved to.
    pub app_id: String,
    /// Where to send the user agent to authenticate.
    pub redirect_url: String,
}

/// Front-channel summary of a freshly initialized session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Opaque session id.
    pub id: String,
    /// Display name of the resolved app.
    pub app_name: String,
    /// Origin the session was started from.
    pub origin: String,
    /// Attributes the app will ask the user for.
    pub attributes: Vec<String>,
}

/// Consent summary for a session's app, masked to attribute names only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentCheck {
    /// Attributes the app requests.
    pub required: Vec<String>,
    /// Attributes the session's user has not consented to yet.
    pub missing: Vec<String>,
}

/// Orchestrates the authorization-code + PKCE exchange.
#[derive(Clone)]
pub struct AuthorizationFlow {
    sessions: SessionStore,
    apps: DynAppDirectory,
    consents: DynConsentStorage,
    issuer: TokenIssuer,
    auth_base: String,
}

impl AuthorizationFlow {
    /// Creates a flow controller. `auth_base` is the public base URL the
    /// authentication surface is reached under.
    #[must_use]
    pub fn new(
        sessions: SessionStore,
        apps: DynAppDirectory,
        consents: DynConsentStorage,
        issuer: TokenIssuer,
        auth_base: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            apps,
            consents,
            issuer,
            auth_base: auth_base.into(),
        }
    }

    /// Session store handle, for collaborators that complete flows.
    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Token issuer handle.
    #[must_use]
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Starts an authorization flow.
    ///
    /// Validates the PKCE method and redirect URI, resolves (or
    /// auto-provisions) the calling app, and creates a `Started` session
    /// carrying the challenge.
    pub async fn authorize(
        &self,
        request: AuthorizationRequest,
    ) -> Result<AuthorizationStarted, AuthError> {
        pkce::require_s256(&request.code_challenge_method)?;
        if request.code_challenge.is_empty() {
            return Err(AuthError::invalid_request("code_challenge is required"));
        }
        Url::parse(&request.redirect_uri)
            .map_err(|_| AuthError::invalid_request("redirect_uri is not a valid URL"))?;

        let app = self
            .resolve_app(request.client_id.as_deref(), &request.origin)
            .await?;

        let mut record = SessionRecord::new(&app.id, &request.origin, &request.client_ip);
        record.oidc_challenge = Some(request.code_challenge.clone());
        let session_id = self.sessions.create(&record).await?;

        let redirect_url = self.authentication_url(&session_id, &request.state)?;
        info!(app_id = %app.id, origin = %request.origin, "Authorization flow started");
        Ok(AuthorizationStarted {
            session_id,
            app_id: app.id,
            redirect_url,
        })
    }

    /// Completes authentication for a session.
    ///
    /// Called by the authentication subsystem once it has verified the
    /// user. Attaches the user, mints the bearer ID token, binds a fresh
    /// server-issued code, and writes the PKCE derived index so the
    /// front-channel client can exchange.
    pub async fn complete_authentication(
        &self,
        session_id: &str,
        user_id: &str,
        nonce: &str,
        passes: Vec<String>,
    ) -> Result<SessionRecord, AuthError> {
        let record = self.sessions.attach_user(session_id, user_id).await?;
        let challenge = record
            .oidc_challenge
            .clone()
            .ok_or_else(|| AuthError::invalid_request("session has no code challenge"))?;

        let bearer = self
            .issuer
            .sign(&IdTokenClaims {
                client: record.app_id.clone(),
                nonce: nonce.to_string(),
                sub: user_id.to_string(),
                iat: fidovault_core::unix_now(),
                passes,
            })
            .await?;
        let code = fidovault_core::generate_opaque(32);
        let record = self.sessions.attach_token(session_id, &bearer, &code).await?;

        let index_key = pkce::derived_index_key(&record.app_id, &challenge);
        self.sessions.put_index(&index_key, session_id).await?;
        info!(app_id = %record.app_id, "Authentication completed");
        Ok(record)
    }

    /// Exchanges a code + verifier for the stored bearer token.
    ///
    /// The derived index is consumed by any attempt that resolves it, so
    /// both a replay and a retry after a failed exchange force the flow to
    /// restart from authorization.
    pub async fn exchange(
        &self,
        client_id: &str,
        code: &str,
        code_verifier: &str,
    ) -> Result<String, AuthError> {
        let challenge = pkce::challenge_from_verifier(code_verifier);
        let index_key = pkce::derived_index_key(client_id, &challenge);

        let session_id = self
            .sessions
            .take_index(&index_key)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        let record = self.sessions.get(&session_id).await?;
        let Some(bearer) = record.bearer_token else {
            warn!(app_id = %record.app_id, "Exchange attempted before authentication completed");
            return Err(AuthError::invalid_request("invalid auth"));
        };
        if record.oidc_code.as_deref() != Some(code) {
            warn!(app_id = %record.app_id, "Exchange attempted with wrong code");
            return Err(AuthError::invalid_request("invalid code"));
        }

        debug!(app_id = %record.app_id, "Code exchanged");
        Ok(bearer)
    }

    /// Initializes a session without an OIDC exchange, for flows (such as
    /// email verification) that only need a correlated session record.
    /// Resolves or auto-provisions the app the same way `authorize` does.
    pub async fn init_session(
        &self,
        client_id: Option<&str>,
        origin: &str,
        client_ip: &str,
    ) -> Result<SessionInfo, AuthError> {
        let app = self.resolve_app(client_id, origin).await?;
        let record = SessionRecord::new(&app.id, origin, client_ip);
        let id = self.sessions.create(&record).await?;
        debug!(app_id = %app.id, "Session initialized");
        Ok(SessionInfo {
            id,
            app_name: app.name,
            origin: origin.to_string(),
            attributes: app.attributes,
        })
    }

    /// Consent summary for a session: the attributes its app requests and
    /// the subset still lacking consent from the session's user. Before
    /// authentication every requested attribute counts as missing.
    pub async fn check_consent(&self, session_id: &str) -> Result<ConsentCheck, AuthError> {
        let record = self.sessions.get(session_id).await?;
        let app = self
            .apps
            .get(&record.app_id)
            .await?
            .ok_or_else(|| AuthError::invalid_app("session app no longer exists"))?;
        let missing = match record.user_id.as_deref() {
            Some(user_id) => match self.consents.get(&record.app_id, user_id).await? {
                Some(consent) => consent.missing(&app.attributes),
                None => app.attributes.clone(),
            },
            None => app.attributes.clone(),
        };
        Ok(ConsentCheck {
            required: app.attributes,
            missing,
        })
    }

    /// Attributes the app requests that the user has not yet consented to.
    /// An empty result means the flow may proceed without a consent prompt.
    pub async fn missing_consent(
        &self,
        app_id: &str,
        user_id: &str,
    ) -> Result<Vec<String>, AuthError> {
        let app = self
            .apps
            .get(app_id)
            .await?
            .ok_or_else(|| AuthError::invalid_app(format!("unknown app {app_id}")))?;
        match self.consents.get(app_id, user_id).await? {
            Some(record) => Ok(record.missing(&app.attributes)),
            None => Ok(app.attributes),
        }
    }

    /// Records the user's consent to the app's requested attributes.
    pub async fn grant_consent(&self, app_id: &str, user_id: &str) -> Result<(), AuthError> {
        let app = self
            .apps
            .get(app_id)
            .await?
            .ok_or_else(|| AuthError::invalid_app(format!("unknown app {app_id}")))?;
        self.consents.grant(app_id, user_id, &app.attributes).await?;
        Ok(())
    }

    async fn resolve_app(
        &self,
        client_id: Option<&str>,
        origin: &str,
    ) -> Result<App, AuthError> {
        if let Some(client_id) = client_id {
            let app = self
                .apps
                .get(client_id)
                .await?
                .ok_or_else(|| AuthError::invalid_app(format!("unknown app {client_id}")))?;
            if !app.allows_origin(origin) {
                return Err(AuthError::invalid_app("origin not registered for app"));
            }
            return Ok(app);
        }

        if let Some(app) = self.apps.find_by_origin(origin).await? {
            return Ok(app);
        }

        // first flow from an unregistered origin provisions a minimal app
        let app = App {
            id: fidovault_core::generate_id(),
            owner_id: "system".to_string(),
            name: origin.to_string(),
            origins: vec![origin.to_string()],
            attributes: vec!["email".to_string()],
        };
        self.apps.upsert(app.clone()).await?;
        info!(app_id = %app.id, origin, "Auto-provisioned app for origin");
        Ok(app)
    }

    fn authentication_url(&self, session_id: &str, state: &str) -> Result<String, AuthError> {
        let mut url = Url::parse(&self.auth_base)
            .and_then(|base| base.join("authenticate"))
            .map_err(|_| AuthError::internal("auth base URL is invalid"))?;
        url.query_pairs_mut()
            .append_pair("session", session_id)
            .append_pair("state", state);
        Ok(url.to_string())
    }
}

impl std::fmt::Debug for AuthorizationFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationFlow")
            .field("auth_base", &self.auth_base)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::in_memory_keystore;
    use crate::storage::{MemoryAppDirectory, MemoryConsentStorage};
    use fidovault_storage::MemoryKv;
    use std::sync::Arc;
    use std::time::Duration;

    fn flow() -> AuthorizationFlow {
        let sessions = SessionStore::new(Arc::new(MemoryKv::new()), Duration::from_secs(1800));
        let issuer = TokenIssuer::new(Arc::new(in_memory_keystore(Duration::from_secs(600))));
        AuthorizationFlow::new(
            sessions,
            Arc::new(MemoryAppDirectory::new()),
            Arc::new(MemoryConsentStorage::new()),
            issuer,
            "https://vault.example.com",
        )
    }

    fn request(challenge: &str) -> AuthorizationRequest {
        AuthorizationRequest {
            client_id: None,
            origin: "https://rp.example".to_string(),
            client_ip: "10.0.0.1".to_string(),
            redirect_uri: "https://rp.example/callback".to_string(),
            code_challenge: challenge.to_string(),
            code_challenge_method: "S256".to_string(),
            state: "xyz".to_string(),
        }
    }

    async fn start_and_authenticate(
        flow: &AuthorizationFlow,
        verifier: &str,
    ) -> (AuthorizationStarted, SessionRecord) {
        let challenge = pkce::challenge_from_verifier(verifier);
        let started = flow.authorize(request(&challenge)).await.unwrap();
        let record = flow
            .complete_authentication(&started.session_id, "u1", "nonce1", vec!["fido2".to_string()])
            .await
            .unwrap();
        (started, record)
    }

    #[tokio::test]
    async fn test_authorize_rejects_plain_method() {
        let flow = flow();
        let mut req = request("challenge");
        req.code_challenge_method = "plain".to_string();
        let err = flow.authorize(req).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_authorize_rejects_bad_redirect_uri() {
        let flow = flow();
        let mut req = request("challenge");
        req.redirect_uri = "not a url".to_string();
        assert!(flow.authorize(req).await.is_err());
    }

    #[tokio::test]
    async fn test_authorize_builds_redirect_and_session() {
        let flow = flow();
        let started = flow.authorize(request("challenge")).await.unwrap();
        assert!(started.redirect_url.contains("authenticate"));
        assert!(started.redirect_url.contains(&started.session_id));
        assert!(started.redirect_url.contains("state=xyz"));

        let record = flow.sessions().get(&started.session_id).await.unwrap();
        assert_eq!(record.oidc_challenge.as_deref(), Some("challenge"));
        assert!(record.bearer_token.is_none());
    }

    #[tokio::test]
    async fn test_auto_provisioned_app_is_reused() {
        let flow = flow();
        let first = flow.authorize(request("c1")).await.unwrap();
        let second = flow.authorize(request("c2")).await.unwrap();
        assert_eq!(first.app_id, second.app_id);
    }

    #[tokio::test]
    async fn test_full_exchange_scenario() {
        let flow = flow();
        let (started, record) = start_and_authenticate(&flow, "verifier1").await;
        let code = record.oidc_code.clone().unwrap();

        let bearer = flow
            .exchange(&started.app_id, &code, "verifier1")
            .await
            .unwrap();
        assert_eq!(bearer, record.bearer_token.unwrap());

        // replay with identical valid inputs fails
        let err = flow
            .exchange(&started.app_id, &code, "verifier1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::SessionNotFound));
    }

    #[tokio::test]
    async fn test_wrong_verifier_resolves_nothing() {
        let flow = flow();
        let (started, record) = start_and_authenticate(&flow, "verifier1").await;
        let code = record.oidc_code.unwrap();

        let err = flow
            .exchange(&started.app_id, &code, "other-verifier")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::SessionNotFound));

        // the real index is untouched by the failed guess
        let bearer = flow.exchange(&started.app_id, &code, "verifier1").await;
        assert!(bearer.is_ok());
    }

    #[tokio::test]
    async fn test_repeated_completion_is_a_replay() {
        let flow = flow();
        let (started, _) = start_and_authenticate(&flow, "v-once").await;

        let err = flow
            .complete_authentication(&started.session_id, "u1", "nonce1", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ReplayDetected));
    }

    #[tokio::test]
    async fn test_wrong_code_rejected() {
        let flow = flow();
        let (started, _) = start_and_authenticate(&flow, "verifier1").await;

        let err = flow
            .exchange(&started.app_id, "wrong-code", "verifier1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidRequest { .. }));
        assert_eq!(err.to_string(), "Invalid request: invalid code");
    }

    #[tokio::test]
    async fn test_exchange_before_authentication_rejected() {
        let flow = flow();
        let challenge = pkce::challenge_from_verifier("verifier1");
        let started = flow.authorize(request(&challenge)).await.unwrap();

        // index only exists after authentication completes, so the
        // exchange cannot even resolve the session
        let err = flow
            .exchange(&started.app_id, "any", "verifier1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::SessionNotFound));
    }

    #[tokio::test]
    async fn test_init_session_returns_app_summary() {
        let flow = flow();
        let info = flow
            .init_session(None, "https://rp.example", "10.0.0.1")
            .await
            .unwrap();
        assert_eq!(info.origin, "https://rp.example");
        assert_eq!(info.attributes, vec!["email".to_string()]);

        let record = flow.sessions().get(&info.id).await.unwrap();
        assert!(record.oidc_challenge.is_none());
        assert!(record.user_id.is_none());
    }

    #[tokio::test]
    async fn test_check_consent_before_and_after_user() {
        let flow = flow();
        let info = flow
            .init_session(None, "https://rp.example", "10.0.0.1")
            .await
            .unwrap();

        // no user yet: everything the app asks for is missing
        let check = flow.check_consent(&info.id).await.unwrap();
        assert_eq!(check.required, vec!["email".to_string()]);
        assert_eq!(check.missing, vec!["email".to_string()]);

        let record = flow.sessions().get(&info.id).await.unwrap();
        flow.sessions().attach_user(&info.id, "u1").await.unwrap();
        flow.grant_consent(&record.app_id, "u1").await.unwrap();
        let check = flow.check_consent(&info.id).await.unwrap();
        assert!(check.missing.is_empty());
    }

    #[tokio::test]
    async fn test_consent_roundtrip() {
        let flow = flow();
        let started = flow.authorize(request("challenge")).await.unwrap();

        let missing = flow.missing_consent(&started.app_id, "u1").await.unwrap();
        assert_eq!(missing, vec!["email".to_string()]);

        flow.grant_consent(&started.app_id, "u1").await.unwrap();
        let missing = flow.missing_consent(&started.app_id, "u1").await.unwrap();
        assert!(missing.is_empty());
    }
}
