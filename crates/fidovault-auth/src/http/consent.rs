//! Masked consent summary endpoint.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;

use crate::http::{AuthState, OidcError};
use crate::oauth::ConsentCheck;

/// Body of `POST /federated/consent/check`.
#[derive(Debug, Deserialize)]
pub struct ConsentCheckRequest {
    /// Session whose app and user the summary is computed for.
    pub session: String,
}

/// Returns which attributes the session's app requests and which still
/// lack consent. Attribute names only; no values leave the service here.
pub async fn check(
    State(state): State<AuthState>,
    Json(request): Json<ConsentCheckRequest>,
) -> Result<Json<ConsentCheck>, OidcError> {
    let check = state.flow.check_consent(&request.session).await?;
    Ok(Json(check))
}
