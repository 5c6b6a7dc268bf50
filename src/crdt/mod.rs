//! Tree-text CRDT implementation module.
//!
//! This module contains the replicated document type and all of its
//! supporting structures: the character-node arena, the balanced order
//! index, the spine lists, and the operation/event types.

pub mod error;
pub mod index;
pub mod node;
pub mod ops;
pub mod spine;
pub mod text;
pub mod types;

// Re-export the main public API
pub use error::{Result, TextError};
pub use node::{CharNode, NodeRef, NodeStore, Side, ROOT_SENTINEL_CHAR};
pub use ops::{OpMeta, Operation, TextEvent};
pub use text::TreeText;
pub use types::{LamportClock, LamportTimestamp, ReplicaId, UniqueId};
