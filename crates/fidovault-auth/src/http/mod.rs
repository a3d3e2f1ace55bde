//! HTTP surface: authorization, token exchange, JWKS, discovery metadata,
//! consent checks and the email verification channel.

pub mod authorize;
pub mod consent;
pub mod discovery;
pub mod email;
pub mod jwks;
pub mod token;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::config::AuthConfig;
use crate::email::EmailVerification;
use crate::error::AuthError;
use crate::keystore::Keystore;
use crate::oauth::AuthorizationFlow;

/// Shared state for all auth handlers.
#[derive(Clone)]
pub struct AuthState {
    /// Authorization flow controller.
    pub flow: AuthorizationFlow,
    /// Email verification service.
    pub email: Arc<EmailVerification>,
    /// Keystore, for JWKS export.
    pub keystore: Arc<Keystore>,
    /// Static configuration.
    pub config: Arc<AuthConfig>,
}

/// Builds the auth router.
pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/.well-known/openid-configuration", get(discovery::metadata))
        .route("/.well-known/jwks", get(jwks::jwks))
        .route("/oidc/auth", get(authorize::authorize))
        .route("/oidc/token", post(token::token))
        .route("/federated/session/init", post(authorize::session_init))
        .route("/federated/consent/check", post(consent::check))
        .route("/federated/email/session", post(email::send_session))
        .route("/federated/email/validate", post(email::validate))
        .route("/federated/email/{session_id}", get(email::socket))
        .with_state(state)
}

/// Client address as reported by the fronting reverse proxy: the first
/// entry of `X-Forwarded-For`. Direct connections carry no header and
/// record an empty address.
pub(crate) fn forwarded_client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

/// OIDC-style error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcErrorBody {
    /// OAuth error code.
    pub error: String,
    /// Human-readable description.
    pub error_description: String,
}

/// Response wrapper translating [`AuthError`] to an OIDC error body.
///
/// Client-caused rejections all come back as HTTP 400 `invalid_request`;
/// only infrastructure failures surface as 500, and those never leak
/// internal detail.
#[derive(Debug)]
pub struct OidcError(pub AuthError);

impl From<AuthError> for OidcError {
    fn from(err: AuthError) -> Self {
        Self(err)
    }
}

impl IntoResponse for OidcError {
    fn into_response(self) -> Response {
        let code = self.0.oauth_error_code();
        let (status, description) = match &self.0 {
            AuthError::UpstreamKms { .. }
            | AuthError::Storage { .. }
            | AuthError::Internal { .. } => {
                error!(error = %self.0, category = %self.0.category(), "Auth request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
            AuthError::SessionNotFound | AuthError::ReplayDetected => {
                (StatusCode::BAD_REQUEST, "no session found".to_string())
            }
            AuthError::InvalidRequest { message } => (StatusCode::BAD_REQUEST, message.clone()),
            AuthError::InvalidApp { message } => (StatusCode::BAD_REQUEST, message.clone()),
            // verification and key failures collapse to one message so the
            // response cannot be used as an oracle
            _ => (StatusCode::BAD_REQUEST, "invalid request".to_string()),
        };
        let body = axum::Json(OidcErrorBody {
            error: code.to_string(),
            error_description: description,
        });
        (status, body).into_response()
    }
}
