//! Lamport timestamp implementation for ordering operations across replicas.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::crdt::types::replica::ReplicaId;

/// A Lamport timestamp: a logical counter plus the originating replica's ID.
///
/// The counter orders causally related operations; the replica ID breaks ties
/// between concurrent ones. Together they give a strict total order over all
/// operations ever produced, which is what makes sibling order (and therefore
/// document order) identical on every replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LamportTimestamp {
    /// The logical clock value when this timestamp was created
    pub counter: u64,
    /// The ID of the replica that created this timestamp
    pub replica_id: ReplicaId,
}

impl PartialOrd for LamportTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LamportTimestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        // Counter first (logical time), replica ID as the deterministic tie-break
        match self.counter.cmp(&other.counter) {
            Ordering::Equal => self.replica_id.cmp(&other.replica_id),
            other => other,
        }
    }
}
