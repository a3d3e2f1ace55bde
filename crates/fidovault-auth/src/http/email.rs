//! Email verification endpoints: starting a verification, the link-click
//! validation, and the WebSocket a client holds open while waiting.

use axum::Json;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::email::{ClientRequest, run_connection};
use crate::http::{AuthState, OidcError};

/// Body of `POST /federated/email/session`.
#[derive(Debug, Deserialize)]
pub struct SendSessionRequest {
    /// Address to verify.
    pub email: String,
    /// Verification purpose (`login`, `add_email`, ...).
    #[serde(rename = "type")]
    pub purpose: String,
    /// Existing session to correlate with; a fresh one is minted when absent.
    pub session: Option<String>,
}

/// Body of the session response. The token is handed back for out-of-band
/// delivery; this service does not send mail itself.
#[derive(Debug, Serialize, Deserialize)]
pub struct SendSessionResponse {
    /// Session id the connection should listen on.
    pub session: String,
    /// Raw validation token for the emailed link.
    pub token: String,
}

/// Starts an email verification and returns its session and token.
pub async fn send_session(
    State(state): State<AuthState>,
    Json(request): Json<SendSessionRequest>,
) -> Result<Json<SendSessionResponse>, OidcError> {
    let (session, token) = state
        .email
        .send_session(&request.email, &request.purpose, request.session.as_deref())
        .await?;
    Ok(Json(SendSessionResponse { session, token }))
}

/// Body of `POST /federated/email/validate`.
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    /// The raw validation token from the emailed link.
    pub token: String,
}

/// Handles the emailed link click: verifies the token and republishes it
/// on the session's channel for any waiting connection.
pub async fn validate(
    State(state): State<AuthState>,
    Json(request): Json<ValidateRequest>,
) -> Result<StatusCode, OidcError> {
    state.email.confirm_click(&request.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Upgrades to the verification WebSocket for a session.
pub async fn socket(
    State(state): State<AuthState>,
    Path(session_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| drive_socket(state, session_id, socket))
}

/// Adapts the WebSocket onto the transport-agnostic connection driver:
/// one task pumps inbound text frames to the driver, one pumps driver
/// output back out. Both end when the driver returns.
async fn drive_socket(state: AuthState, session_id: String, socket: WebSocket) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let (in_tx, in_rx) = mpsc::channel::<ClientRequest>(8);
    let (out_tx, mut out_rx) = mpsc::channel::<String>(8);

    let reader = tokio::spawn(async move {
        while let Some(Ok(message)) = ws_stream.next().await {
            match message {
                Message::Text(text) => match serde_json::from_str::<ClientRequest>(&text) {
                    Ok(request) => {
                        if in_tx.send(request).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        debug!(error = %err, "Ignoring undecodable verification request");
                    }
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
        // dropping in_tx tells the driver the client is gone
    });

    let writer = tokio::spawn(async move {
        while let Some(reply) = out_rx.recv().await {
            if ws_sink.send(Message::Text(reply.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_sink.send(Message::Close(None)).await;
    });

    run_connection(
        state.email.clone(),
        session_id,
        in_rx,
        out_tx,
        state.config.email.socket_idle_timeout,
    )
    .await;

    // driver returned: stop reading and let the writer drain out
    reader.abort();
    let _ = writer.await;
}
