//! Replica identifier type.

/// A unique identifier for each replica (collaborator) in the distributed system.
///
/// Each participant in the collaborative editing session should have a unique
/// replica ID; it is the tie-breaker that makes node identifiers totally ordered
/// across replicas.
pub type ReplicaId = u64;
