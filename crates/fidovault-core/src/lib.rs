//! # fidovault-core
//!
//! Shared primitives for the FidoVault identity backend:
//!
//! - [`id`] - opaque identifier generation (session ids, OIDC codes)
//! - [`time`] - unix-timestamp helpers for issued-at freshness checks
//! - [`pubsub`] - topic-keyed publish/subscribe channels used to correlate
//!   out-of-band email clicks with open client connections

pub mod id;
pub mod pubsub;
pub mod time;

pub use id::{generate_id, generate_opaque};
pub use pubsub::SessionChannels;
pub use time::{is_stale, unix_now};
