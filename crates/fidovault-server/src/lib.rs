//! # fidovault-server
//!
//! Wires the auth components into a running HTTP service: in-memory
//! backends for single-node deployments, the axum router from
//! `fidovault-auth`, and request tracing / CORS layers on top.

pub mod config;
pub mod observability;

use std::sync::Arc;

use anyhow::bail;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use fidovault_auth::config::WrappingMode;
use fidovault_auth::email::EmailVerification;
use fidovault_auth::http::{AuthState, router};
use fidovault_auth::keystore::{DynKeyWrapper, Keystore, MemoryKeyRepository, PlainWrapper};
use fidovault_auth::oauth::{AuthorizationFlow, SessionStore};
use fidovault_auth::storage::{MemoryAppDirectory, MemoryConsentStorage, MemoryUserDirectory};
use fidovault_auth::token::TokenIssuer;
use fidovault_core::SessionChannels;
use fidovault_storage::MemoryKv;

use crate::config::ServerConfig;

/// Builds the application router with in-memory backends.
///
/// Production deployments substitute their own implementations of the
/// storage traits here; everything downstream is backend-agnostic.
/// Configuring `wrapping = "kms"` is an error in this build rather than a
/// silent fallback to pass-through wrapping.
pub fn build_router(config: &ServerConfig) -> anyhow::Result<Router> {
    let wrapper: DynKeyWrapper = match config.auth.keystore.wrapping {
        WrappingMode::Local => Arc::new(PlainWrapper),
        WrappingMode::Kms => {
            bail!("wrapping = \"kms\" requires a KMS client; this build only supports \"local\"")
        }
    };
    let keystore = Arc::new(Keystore::new(
        Arc::new(MemoryKeyRepository::new()),
        wrapper,
        config.auth.keystore.cache_ttl,
    ));
    let issuer = TokenIssuer::new(keystore.clone());
    let sessions = SessionStore::new(Arc::new(MemoryKv::new()), config.auth.session.ttl);
    let flow = AuthorizationFlow::new(
        sessions,
        Arc::new(MemoryAppDirectory::new()),
        Arc::new(MemoryConsentStorage::new()),
        issuer.clone(),
        config.auth.issuer.clone(),
    );
    let email = Arc::new(EmailVerification::new(
        issuer,
        flow.clone(),
        Arc::new(MemoryUserDirectory::new()),
        SessionChannels::new(),
        config.auth.email.token_freshness,
    ));

    let state = AuthState {
        flow,
        email,
        keystore,
        config: Arc::new(config.auth.clone()),
    };

    Ok(router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()))
}
