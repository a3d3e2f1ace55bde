//! Token exchange endpoint.

use axum::Json;
use axum::extract::{Form, State};
use serde::{Deserialize, Serialize};

use crate::http::{AuthState, OidcError};

/// Form body of `POST /oidc/token`.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    /// Client id the flow was started for.
    pub client_id: String,
    /// Server-issued code bound at authentication completion.
    pub code: String,
    /// PKCE code verifier.
    pub code_verifier: String,
}

/// Successful exchange response.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The bearer ID token stored at authentication completion.
    pub id_token: String,
    /// Token type, always `"Bearer"`.
    pub token_type: String,
}

/// Exchanges a code + verifier for the stored bearer token.
pub async fn token(
    State(state): State<AuthState>,
    Form(request): Form<TokenRequest>,
) -> Result<Json<TokenResponse>, OidcError> {
    let id_token = state
        .flow
        .exchange(&request.client_id, &request.code, &request.code_verifier)
        .await?;
    Ok(Json(TokenResponse {
        id_token,
        token_type: "Bearer".to_string(),
    }))
}
