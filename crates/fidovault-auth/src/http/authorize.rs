//! Authorization and session-init endpoints.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Redirect;
use serde::Deserialize;

use crate::http::{AuthState, OidcError, forwarded_client_ip};
use crate::oauth::{AuthorizationRequest, SessionInfo};

/// Query parameters of `GET /oidc/auth`.
#[derive(Debug, Deserialize)]
pub struct AuthorizeParams {
    /// Client id; optional when the app is resolved by origin.
    pub client_id: Option<String>,
    /// Origin of the requesting front channel.
    #[serde(default)]
    pub origin: String,
    /// Redirect URI of the relying party.
    pub redirect_uri: String,
    /// PKCE code challenge.
    pub code_challenge: String,
    /// PKCE challenge method.
    #[serde(default)]
    pub code_challenge_method: String,
    /// Opaque relying-party state.
    #[serde(default)]
    pub state: String,
}

/// Starts an authorization flow and redirects the user agent to the
/// authentication surface.
pub async fn authorize(
    State(state): State<AuthState>,
    headers: HeaderMap,
    Query(params): Query<AuthorizeParams>,
) -> Result<Redirect, OidcError> {
    let started = state
        .flow
        .authorize(AuthorizationRequest {
            client_id: params.client_id,
            origin: params.origin,
            client_ip: forwarded_client_ip(&headers),
            redirect_uri: params.redirect_uri,
            code_challenge: params.code_challenge,
            code_challenge_method: params.code_challenge_method,
            state: params.state,
        })
        .await?;
    Ok(Redirect::to(&started.redirect_url))
}

/// Body of `POST /federated/session/init`.
#[derive(Debug, Deserialize)]
pub struct SessionInitRequest {
    /// Client id; optional when the app is resolved by origin.
    pub client_id: Option<String>,
    /// Origin of the requesting front channel.
    #[serde(default)]
    pub origin: String,
}

/// Creates a bare session for flows that start outside the OIDC redirect,
/// returning the resolved app's summary.
pub async fn session_init(
    State(state): State<AuthState>,
    headers: HeaderMap,
    Json(request): Json<SessionInitRequest>,
) -> Result<Json<SessionInfo>, OidcError> {
    let info = state
        .flow
        .init_session(
            request.client_id.as_deref(),
            &request.origin,
            &forwarded_client_ip(&headers),
        )
        .await?;
    Ok(Json(info))
}
