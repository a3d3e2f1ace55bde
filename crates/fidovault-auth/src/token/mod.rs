//! Token issuance: typed claim sets, compact ES256 encoding, and the
//! issuer that binds the two to the key lifecycle.

pub mod claims;
pub mod compact;
pub mod issuer;

pub use claims::{ClaimSet, DashboardSessionClaims, EmailValidationClaims, IdTokenClaims};
pub use compact::{ALG_ES256, Header, ParsedToken};
pub use issuer::TokenIssuer;
