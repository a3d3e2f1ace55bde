use std::env;
use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use fidovault_server::config::load_config;
use fidovault_server::{build_router, observability};

/// Default configuration path next to the binary's working directory.
const DEFAULT_CONFIG: &str = "fidovault.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = resolve_config_path();
    let config = load_config(&config_path)?;
    observability::init_tracing(&config.logging.level);
    info!(path = %config_path.display(), "Configuration loaded");

    let addr = config.server.addr()?;
    let router = build_router(&config)?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, issuer = %config.auth.issuer, "FidoVault server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("Server stopped");
    Ok(())
}

/// Config path priority: `--config <path>`, then `FIDOVAULT_CONFIG`, then
/// the default.
fn resolve_config_path() -> PathBuf {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return PathBuf::from(path);
            }
        }
    }
    if let Ok(path) = env::var("FIDOVAULT_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_CONFIG)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install shutdown handler");
    }
}
