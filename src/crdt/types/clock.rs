//! Thread-safe Lamport clock for generating timestamps.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::crdt::types::replica::ReplicaId;
use crate::crdt::types::timestamp::LamportTimestamp;

/// A thread-safe clock for generating Lamport timestamps.
///
/// Counters start at 1; the `(0, 0)` timestamp is reserved for the document's
/// root sentinel and is never produced by a clock.
pub struct LamportClock {
    counter: AtomicU64,
    replica_id: ReplicaId,
}

impl LamportClock {
    /// Creates a new Lamport clock for the given replica.
    pub fn new(replica_id: ReplicaId) -> Self {
        LamportClock {
            counter: AtomicU64::new(0),
            replica_id,
        }
    }

    /// Generates the next timestamp for this replica.
    pub fn tick(&self) -> LamportTimestamp {
        let counter = self.counter.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        LamportTimestamp {
            counter,
            replica_id: self.replica_id,
        }
    }

    /// Folds a received timestamp into the clock so that timestamps generated
    /// after a remote operation compare greater than it (causal consistency).
    pub fn update(&self, received: LamportTimestamp) {
        let mut current = self.counter.load(AtomicOrdering::SeqCst);
        while current < received.counter {
            match self.counter.compare_exchange_weak(
                current,
                received.counter,
                AtomicOrdering::SeqCst,
                AtomicOrdering::SeqCst,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// Gets the current counter value (for debugging).
    pub fn current_counter(&self) -> u64 {
        self.counter.load(AtomicOrdering::SeqCst)
    }

    /// Gets the replica ID.
    pub fn replica_id(&self) -> ReplicaId {
        self.replica_id
    }
}
