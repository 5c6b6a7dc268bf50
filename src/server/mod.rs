//! Web server module for the tree-text CRDT service.
//!
//! This module contains the Axum web server that hosts a shared document and
//! relays operations between connected editing sessions.

pub mod routes;
pub mod websocket;

// Re-export main server functionality
pub use routes::*;
