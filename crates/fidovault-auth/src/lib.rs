//! # fidovault-auth
//!
//! Key lifecycle, token issuance and session correlation for the FidoVault
//! identity backend.
//!
//! ## Components
//!
//! - [`keystore`] - ES256 signing keys per scope: generation on first use,
//!   envelope wrapping, rotation, and a bounded-lifetime lookup cache
//! - [`token`] - typed claim sets and the compact `header.payload.signature`
//!   encoding, signed and verified through the keystore
//! - [`oauth`] - the authorization-code + PKCE exchange over TTL-bound
//!   sessions, with a single-use derived index as the anti-replay mechanism
//! - [`email`] - out-of-band email verification correlated to a waiting
//!   connection through per-session pub/sub channels
//! - [`storage`] - durable collaborators: apps, users, consent
//! - [`http`] - axum handlers for the endpoints above
//!
//! ## Flow
//!
//! A relying party starts at [`oauth::AuthorizationFlow::authorize`]; the
//! authentication subsystem (WebAuthn, out of scope here) completes it with
//! [`oauth::AuthorizationFlow::complete_authentication`], which mints the
//! bearer ID token and arms the PKCE index; the front channel then calls
//! [`oauth::AuthorizationFlow::exchange`] with its verifier. Email-verified
//! logins instead hold a socket open per session and are completed by
//! [`email::EmailVerification`] when the emailed link is clicked.

pub mod config;
pub mod email;
pub mod error;
pub mod http;
pub mod keystore;
pub mod oauth;
pub mod storage;
pub mod token;

pub use config::AuthConfig;
pub use error::{AuthError, ErrorCategory};
pub use keystore::{KeyScope, KeyStatus, Keystore};
pub use oauth::{AuthorizationFlow, SessionRecord, SessionStore};
pub use token::{
    DashboardSessionClaims, EmailValidationClaims, IdTokenClaims, TokenIssuer,
};
