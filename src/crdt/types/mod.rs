//! Fundamental type definitions for the tree-text CRDT.
//!
//! This module contains the core identity types used throughout the
//! implementation: replica identifiers, Lamport timestamps and clocks, and
//! the totally ordered node identifiers built from them.

pub mod clock;
pub mod replica;
pub mod timestamp;
pub mod unique_id;

pub use clock::LamportClock;
pub use replica::ReplicaId;
pub use timestamp::LamportTimestamp;
pub use unique_id::UniqueId;
