//! Authentication service configuration.
//!
//! Configuration types for the FidoVault auth module, covering key lifecycle,
//! session storage, the authorization-code exchange and the email
//! verification channel.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root authentication configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// issuer = "https://vault.example.com"
///
/// [auth.session]
/// ttl = "30m"
///
/// [auth.keystore]
/// cache_ttl = "10m"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Issuer URL placed in discovery metadata and used to build the
    /// `jwks_uri` and endpoint URLs. Should be the public base URL.
    pub issuer: String,

    /// Keystore configuration.
    pub keystore: KeystoreConfig,

    /// Session store configuration.
    pub session: SessionConfig,

    /// Email verification channel configuration.
    pub email: EmailConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            keystore: KeystoreConfig::default(),
            session: SessionConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

/// Keystore configuration.
///
/// Controls key-material caching and the envelope-encryption backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeystoreConfig {
    /// How long unwrapped key material stays in the in-process cache
    /// without being touched. Bounds the exposure window of plaintext
    /// private keys in memory.
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,

    /// Key wrapping backend. `"local"` wraps with an in-process master
    /// key; `"kms"` delegates wrap/unwrap to an external KMS.
    pub wrapping: WrappingMode,
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(600), // 10 minutes
            wrapping: WrappingMode::Local,
        }
    }
}

/// Which backend wraps and unwraps private key material at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WrappingMode {
    /// In-process wrapping with a locally held master key.
    Local,
    /// External key-management service performs wrap/unwrap.
    Kms,
}

/// Session store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session lifetime. Every write re-arms the full TTL, so this is an
    /// idle timeout rather than an absolute one.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60), // 30 minutes
        }
    }
}

/// Email verification channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Maximum age of an email verification token's `iat` before it is
    /// rejected as stale.
    #[serde(with = "humantime_serde")]
    pub token_freshness: Duration,

    /// How long a waiting socket connection may sit idle before the
    /// server closes it.
    #[serde(with = "humantime_serde")]
    pub socket_idle_timeout: Duration,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            token_freshness: Duration::from_secs(5 * 60),
            socket_idle_timeout: Duration::from_secs(5 * 60),
        }
    }
}
