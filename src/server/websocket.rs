//! WebSocket session management for collaborative editing.
//!
//! Each connected session sends encoded operations over its socket; the
//! server applies them to the hosted document and relays them to every other
//! session. The originating session never receives its own operations back.

use axum::extract::ws::{Message, WebSocket};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::crdt::{OpMeta, Operation};
use crate::server::routes::AppState;

/// One relayed operation: the session that produced it plus the encoded
/// payload, forwarded verbatim to every other session.
#[derive(Debug, Clone)]
pub struct RelayFrame {
    pub session_id: String,
    pub payload: String,
}

/// Initial frame sent to a newly connected client.
#[derive(Serialize, Debug)]
pub struct InitFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    pub content: String,
}

/// WebSocket session manager
pub struct WebSocketSession {
    socket: WebSocket,
    state: AppState,
    session_id: String,
    relay_rx: broadcast::Receiver<RelayFrame>,
}

impl WebSocketSession {
    /// Create a new WebSocket session
    pub fn new(socket: WebSocket, state: AppState, session_id: String) -> Self {
        let relay_rx = state.relay.subscribe();
        Self {
            socket,
            state,
            session_id,
            relay_rx,
        }
    }

    /// Handle the WebSocket connection lifecycle
    pub async fn handle(mut self) {
        info!("WebSocket session {} established", self.session_id);

        // Send initial document state
        if let Err(e) = self.send_initial_state().await {
            error!("Failed to send initial state to {}: {}", self.session_id, e);
            return;
        }

        loop {
            tokio::select! {
                msg = self.socket.recv() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text_message(&text);
                        }
                        Some(Ok(Message::Close(_))) => {
                            info!("WebSocket session {} closed by client", self.session_id);
                            break;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = self.socket.send(Message::Pong(data)).await {
                                error!("Failed to send pong to {}: {}", self.session_id, e);
                                break;
                            }
                        }
                        Some(Ok(_)) => {
                            // Ignore other message types (binary, pong)
                        }
                        Some(Err(e)) => {
                            warn!("WebSocket error for {}: {}", self.session_id, e);
                            break;
                        }
                        None => break,
                    }
                }
                frame = self.relay_rx.recv() => {
                    match frame {
                        Ok(frame) if frame.session_id != self.session_id => {
                            if let Err(e) = self.socket.send(Message::Text(frame.payload)).await {
                                warn!("Failed to relay to {}: {}", self.session_id, e);
                                break;
                            }
                        }
                        Ok(_) => {
                            // own operation echoed back by the relay; skip
                        }
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            warn!("Session {} lagged behind by {} operations", self.session_id, missed);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }

        info!("WebSocket session {} ended", self.session_id);
    }

    /// Send initial document state to newly connected client
    async fn send_initial_state(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let content = self.state.doc.read().to_string();

        let frame = InitFrame {
            frame_type: "init".to_string(),
            content,
        };
        let json = serde_json::to_string(&frame)?;
        self.socket.send(Message::Text(json)).await?;
        Ok(())
    }

    /// Apply an incoming operation and hand it to the relay.
    fn handle_text_message(&mut self, text: &str) {
        info!("Session {} received: {}", self.session_id, text);

        let op = match Operation::decode(text.as_bytes()) {
            Ok(op) => op,
            Err(e) => {
                warn!("Failed to parse operation from {}: {}", self.session_id, e);
                return; // Don't break connection for parse errors
            }
        };

        let origin = op.target().replica_id();
        let applied = {
            let mut doc = self.state.doc.write();
            doc.apply(&op, OpMeta::remote(origin))
        };

        match applied {
            Ok(_) => {
                let _ = self.state.relay.send(RelayFrame {
                    session_id: self.session_id.clone(),
                    payload: text.to_string(),
                });
            }
            Err(e) => {
                error!(
                    "Failed to apply operation from session {}: {}",
                    self.session_id, e
                );
            }
        }
    }
}

/// Generate a unique session ID
pub fn generate_session_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    format!("session_{}", timestamp)
}

/// Create and handle a new WebSocket session
pub async fn handle_websocket_connection(socket: WebSocket, state: AppState) {
    let session_id = generate_session_id();
    let session = WebSocketSession::new(socket, state, session_id);
    session.handle().await;
}
