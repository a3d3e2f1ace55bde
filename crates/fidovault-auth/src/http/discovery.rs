//! OIDC discovery metadata.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::http::AuthState;

/// The subset of OIDC provider metadata this service publishes.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Issuer base URL.
    pub issuer: String,
    /// Authorization endpoint URL.
    pub authorization_endpoint: String,
    /// Token endpoint URL.
    pub token_endpoint: String,
    /// JWKS URL.
    pub jwks_uri: String,
    /// Supported response types.
    pub response_types_supported: Vec<String>,
    /// Supported PKCE challenge methods.
    pub code_challenge_methods_supported: Vec<String>,
    /// Supported signing algorithms.
    pub id_token_signing_alg_values_supported: Vec<String>,
}

/// Serves `/.well-known/openid-configuration`.
pub async fn metadata(State(state): State<AuthState>) -> Json<ProviderMetadata> {
    let issuer = state.config.issuer.trim_end_matches('/').to_string();
    Json(ProviderMetadata {
        authorization_endpoint: format!("{issuer}/oidc/auth"),
        token_endpoint: format!("{issuer}/oidc/token"),
        jwks_uri: format!("{issuer}/.well-known/jwks"),
        issuer,
        response_types_supported: vec!["code".to_string()],
        code_challenge_methods_supported: vec![crate::oauth::METHOD_S256.to_string()],
        id_token_signing_alg_values_supported: vec![crate::token::ALG_ES256.to_string()],
    })
}
