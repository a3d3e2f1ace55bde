//! Verification connection driver.
//!
//! One long-lived bidirectional connection per session id. The driver owns
//! two children: the reader (inbound client requests) and at most one
//! subscriber waiting on the session's pub/sub channel. A new inbound
//! request replaces the subscriber; the old one is aborted first so its
//! broadcast receiver is dropped, never leaked. An idle timer bounds the
//! whole connection's lifetime and cancels both children when it fires.
//!
//! The driver is transport-agnostic: the HTTP layer adapts a WebSocket (or
//! anything else bidirectional) onto the inbound/outbound channel pair.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::email::service::EmailVerification;

/// Inbound client request: which email to wait for, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRequest {
    /// Email address the client expects to be verified.
    pub email: String,
    /// Verification purpose, e.g. `"login"`.
    #[serde(rename = "type")]
    pub purpose: String,
}

/// Drives one verification connection to completion.
///
/// Returns when the client closes the inbound side, the outbound side is
/// gone, or the idle timeout fires. All subordinate tasks are cancelled
/// and the session's topic released before returning.
pub async fn run_connection(
    service: Arc<EmailVerification>,
    session_id: String,
    mut inbound: mpsc::Receiver<ClientRequest>,
    outbound: mpsc::Sender<String>,
    idle_timeout: Duration,
) {
    let deadline = tokio::time::sleep(idle_timeout);
    tokio::pin!(deadline);
    let mut subscriber: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            () = &mut deadline => {
                debug!(session = %session_id, "Verification connection idle timeout");
                break;
            }
            request = inbound.recv() => {
                let Some(request) = request else {
                    debug!(session = %session_id, "Verification connection closed by client");
                    break;
                };
                // at most one subscriber per connection
                if let Some(previous) = subscriber.take() {
                    previous.abort();
                }
                subscriber = Some(tokio::spawn(wait_for_token(
                    service.clone(),
                    session_id.clone(),
                    request,
                    outbound.clone(),
                )));
            }
        }
    }

    if let Some(handle) = subscriber.take() {
        handle.abort();
        // receiver drops with the task; now the topic can be collected
        let _ = handle.await;
    }
    service.channels().release(&session_id);
}

/// Waits on the session's channel and reacts to published tokens.
///
/// Tokens that fail verification are ignored and the wait continues; a
/// stale or mismatched republish must not produce any client-visible
/// output. The task ends after the first successful delivery.
async fn wait_for_token(
    service: Arc<EmailVerification>,
    session_id: String,
    request: ClientRequest,
    outbound: mpsc::Sender<String>,
) {
    let mut rx = service.channels().subscribe(&session_id);
    loop {
        let raw_token = match rx.recv().await {
            Ok(token) => token,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(session = %session_id, skipped, "Verification subscriber lagged");
                continue;
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        };

        match service
            .handle_published(&session_id, &request.email, &raw_token)
            .await
        {
            Ok(reply) => {
                if outbound.send(reply).await.is_err() {
                    debug!(session = %session_id, "Outbound side gone, dropping reply");
                }
                break;
            }
            Err(err) => {
                debug!(session = %session_id, error = %err, "Ignoring unusable published token");
            }
        }
    }
    drop(rx);
    service.channels().release(&session_id);
}
