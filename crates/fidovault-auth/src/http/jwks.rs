//! Public key endpoint.

use axum::Json;
use axum::extract::State;

use crate::http::{AuthState, OidcError};
use crate::keystore::JwkSet;

/// Returns the current signing-scope public key set for third-party
/// verification.
pub async fn jwks(State(state): State<AuthState>) -> Result<Json<JwkSet>, OidcError> {
    let set = state.keystore.jwks().await?;
    Ok(Json(set))
}
