//! Unique identifier for character nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crdt::types::replica::ReplicaId;
use crate::crdt::types::timestamp::LamportTimestamp;

/// A unique identifier for each character node in the document.
///
/// This is a newtype over [`LamportTimestamp`], inheriting its strict total
/// order. The order is what ranks concurrent siblings under the same tree
/// position, so every replica lays out conflicting insertions identically.
///
/// `UniqueId::root()` is the reserved identifier of the root sentinel; clocks
/// start counting at 1 so no real node can collide with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UniqueId(pub LamportTimestamp);

impl UniqueId {
    /// Creates a new UniqueId from a counter and replica_id.
    pub fn new(counter: u64, replica_id: ReplicaId) -> Self {
        UniqueId(LamportTimestamp {
            counter,
            replica_id,
        })
    }

    /// The reserved identifier of the root sentinel node.
    pub fn root() -> Self {
        UniqueId::new(0, 0)
    }

    /// Returns true if this is the root sentinel's identifier.
    pub fn is_root(&self) -> bool {
        *self == UniqueId::root()
    }

    /// Gets the underlying LamportTimestamp.
    pub fn timestamp(&self) -> LamportTimestamp {
        self.0
    }

    /// Gets the counter value from the timestamp.
    pub fn counter(&self) -> u64 {
        self.0.counter
    }

    /// Gets the replica_id from the timestamp.
    pub fn replica_id(&self) -> ReplicaId {
        self.0.replica_id
    }
}

impl From<LamportTimestamp> for UniqueId {
    fn from(timestamp: LamportTimestamp) -> Self {
        UniqueId(timestamp)
    }
}

impl From<UniqueId> for LamportTimestamp {
    fn from(id: UniqueId) -> Self {
        id.0
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.0.counter, self.0.replica_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_id_creation() {
        let id = UniqueId::new(5, 10);
        assert_eq!(id.counter(), 5);
        assert_eq!(id.replica_id(), 10);
    }

    #[test]
    fn test_unique_id_ordering() {
        let id1 = UniqueId::new(1, 1);
        let id2 = UniqueId::new(1, 2);
        let id3 = UniqueId::new(2, 1);

        assert!(id1 < id2);
        assert!(id1 < id3);
        assert!(id2 < id3);
    }

    #[test]
    fn test_root_is_minimal() {
        let root = UniqueId::root();
        assert!(root.is_root());
        assert!(root < UniqueId::new(1, 0));
        assert!(root < UniqueId::new(1, u64::MAX));
    }

    #[test]
    fn test_conversion_between_types() {
        let timestamp = LamportTimestamp {
            counter: 42,
            replica_id: 7,
        };
        let id: UniqueId = timestamp.into();
        let back: LamportTimestamp = id.into();

        assert_eq!(timestamp, back);
        assert_eq!(id.timestamp(), timestamp);
    }

    #[test]
    fn test_wire_round_trip() {
        let id = UniqueId::new(42, 7);
        let json = serde_json::to_string(&id).unwrap();
        let decoded: UniqueId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, decoded);
    }

    #[test]
    fn test_display() {
        let id = UniqueId::new(42, 7);
        assert_eq!(format!("{}", id), "42@7");
    }
}
