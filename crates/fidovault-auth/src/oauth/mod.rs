//! OIDC-style authorization-code + PKCE exchange over the ephemeral
//! session store.

pub mod pkce;
pub mod service;
pub mod session;

pub use pkce::{METHOD_S256, challenge_from_verifier, derived_index_key, require_s256};
pub use service::{
    AuthorizationFlow, AuthorizationRequest, AuthorizationStarted, ConsentCheck, SessionInfo,
};
pub use session::{SessionRecord, SessionStore};
