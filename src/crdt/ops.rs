//! Wire operations, operation metadata and edit events.
//!
//! Every local edit is broken down into single-character operations; each
//! operation is a self-describing tagged record so that any replica can apply
//! it without further context (given causal delivery).

use serde::{Deserialize, Serialize};

use crate::crdt::error::Result;
use crate::crdt::types::{ReplicaId, UniqueId};

/// A single replicated operation.
///
/// `Insert` anchors a new character node under an existing node, on its left
/// or right side; sibling order among concurrent inserts at the same anchor
/// follows the id order. `Delete` tombstones a node without structural change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Operation {
    Insert {
        id: UniqueId,
        #[serde(rename = "parentID")]
        parent_id: UniqueId,
        #[serde(rename = "isLeftChild")]
        is_left_child: bool,
        value: char,
    },
    Delete {
        id: UniqueId,
    },
}

impl Operation {
    /// The id of the node this operation creates or tombstones.
    pub fn target(&self) -> UniqueId {
        match self {
            Operation::Insert { id, .. } => *id,
            Operation::Delete { id } => *id,
        }
    }

    /// Encodes the operation for transport.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes an operation received from transport.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Causal metadata attached to a delivered operation, forwarded in events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpMeta {
    /// The replica that produced the operation.
    pub origin: ReplicaId,
    /// True when the operation was produced by this replica's own edit call.
    pub is_local: bool,
}

impl OpMeta {
    pub fn local(origin: ReplicaId) -> Self {
        OpMeta {
            origin,
            is_local: true,
        }
    }

    pub fn remote(origin: ReplicaId) -> Self {
        OpMeta {
            origin,
            is_local: false,
        }
    }
}

/// An edit event, emitted synchronously after each applied operation.
///
/// `index` is the character's position at the time the event fires; `id` is
/// the stable node identifier, still valid as an `index_of` argument after
/// later edits move the character around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEvent {
    Insert {
        index: usize,
        value: char,
        id: UniqueId,
        meta: OpMeta,
    },
    Delete {
        index: usize,
        value: char,
        id: UniqueId,
        meta: OpMeta,
    },
}

impl TextEvent {
    pub fn index(&self) -> usize {
        match self {
            TextEvent::Insert { index, .. } => *index,
            TextEvent::Delete { index, .. } => *index,
        }
    }
}
