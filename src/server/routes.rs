//! Route handlers for the tree-text CRDT web server.
//!
//! This module contains the HTTP route handlers, the shared server state and
//! related types for the Axum server.

use std::sync::Arc;

use axum::{
    extract::{State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::crdt::TreeText;
use crate::server::websocket::{handle_websocket_connection, RelayFrame};

/// Replica id the server's own document instance runs under.
const SERVER_REPLICA_ID: u64 = 0;

/// Shared application state: the hosted document plus the op relay channel.
pub struct ServerState {
    pub doc: RwLock<TreeText>,
    pub relay: broadcast::Sender<RelayFrame>,
}

pub type AppState = Arc<ServerState>;

/// Creates the shared state for a fresh document.
pub fn new_state() -> AppState {
    let (relay, _) = broadcast::channel(256);
    Arc::new(ServerState {
        doc: RwLock::new(TreeText::new(SERVER_REPLICA_ID)),
        relay,
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct HelloResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct DocumentResponse {
    pub content: String,
    pub length: usize,
    pub node_count: usize,
    pub timestamp: String,
}

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum EditRequest {
    Insert { index: usize, text: String },
    Delete { index: usize, count: usize },
}

#[derive(Serialize)]
pub struct EditResponse {
    pub content: String,
    pub length: usize,
    pub timestamp: String,
}

/// Basic health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running!".to_string(),
    })
}

/// Simple hello world endpoint
pub async fn hello() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello from the tree-text server!".to_string(),
    })
}

/// Returns the current document state.
pub async fn document(State(state): State<AppState>) -> Json<DocumentResponse> {
    let doc = state.doc.read();
    Json(DocumentResponse {
        content: doc.to_string(),
        length: doc.len(),
        node_count: doc.node_count(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Applies an index-based edit to the hosted document and relays the
/// resulting operations to connected websocket sessions.
pub async fn edit(
    State(state): State<AppState>,
    Json(request): Json<EditRequest>,
) -> Result<Json<EditResponse>, (StatusCode, String)> {
    let mut doc = state.doc.write();
    let ops = match request {
        EditRequest::Insert { index, text } => doc.insert(index, &text),
        EditRequest::Delete { index, count } => doc.delete(index, count),
    }
    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    for op in &ops {
        if let Ok(payload) = op.encode() {
            // ignore send errors: no websocket session may be listening
            let _ = state.relay.send(RelayFrame {
                session_id: "http".to_string(),
                payload: String::from_utf8_lossy(&payload).into_owned(),
            });
        }
    }

    Ok(Json(EditResponse {
        content: doc.to_string(),
        length: doc.len(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

/// Upgrades to a websocket editing session.
pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket_connection(socket, state))
}

/// Creates and configures the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/health", get(health))
        .route("/document", get(document))
        .route("/edit", post(edit))
        .route("/ws", get(ws_handler))
        .with_state(state)
}
