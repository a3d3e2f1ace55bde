//! Out-of-band email verification: token minting, the click handler's
//! republish, and the long-lived connection that waits for it.

pub mod connection;
pub mod service;

pub use connection::{ClientRequest, run_connection};
pub use service::{EmailVerification, PURPOSE_LOGIN};
