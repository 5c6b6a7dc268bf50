//! Main entry point for the tree-text CRDT web server.
//!
//! This binary hosts a shared collaborative document over HTTP and
//! WebSocket using the Axum web framework.

use std::net::SocketAddr;

use tracing::{info, Level};

use crdt_treetext::server::{create_router, new_state};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting tree-text CRDT server...");

    let state = new_state();
    let app = create_router(state);

    // Define the address to bind to
    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));

    info!("Server listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET  /          - Hello message");
    info!("  GET  /health    - Health check");
    info!("  GET  /document  - Current document state");
    info!("  POST /edit      - Index-based insert/delete");
    info!("  GET  /ws        - WebSocket op relay");
    info!("");
    info!("Try these commands:");
    info!("  curl http://localhost:3000/document");
    info!(
        "  curl -X POST http://localhost:3000/edit -H 'Content-Type: application/json' -d '{{\"action\":\"insert\",\"index\":0,\"text\":\"Hello\"}}'"
    );

    // Run the server
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind server address");
    axum::serve(listener, app).await.expect("server error");
}
