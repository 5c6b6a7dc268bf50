//! # Tree-Text CRDT
//!
//! An operation-based Conflict-free Replicated Data Type (CRDT) for
//! collaborative plain-text editing. Concurrent insertions and deletions
//! from any number of replicas merge without coordination, and every replica
//! that has seen the same operations renders byte-identical text.
//!
//! ## Features
//!
//! - **Conflict-free**: concurrent operations converge regardless of arrival
//!   order (within causal delivery)
//! - **Logarithmic positions**: index↔character lookups run in O(log n) even
//!   though the underlying anchor tree is unbalanced
//! - **Tombstone-based deletion**: deleted characters keep their place so
//!   concurrent edits around them stay anchored
//! - **Stable positions**: a character's id survives edits elsewhere and can
//!   be resolved back to an index at any time
//!
//! ## Example
//!
//! ```rust
//! use crdt_treetext::{OpMeta, TreeText};
//!
//! let mut alice = TreeText::new(1);
//! let mut bob = TreeText::new(2);
//!
//! let ops = alice.insert(0, "hello").unwrap();
//! for op in &ops {
//!     bob.apply(op, OpMeta::remote(1)).unwrap();
//! }
//!
//! assert_eq!(alice.to_string(), bob.to_string());
//! ```

pub mod crdt;
pub mod server;

// Re-export the main public API from the CRDT module
pub use crdt::{LamportClock, LamportTimestamp, ReplicaId, UniqueId};
pub use crdt::{OpMeta, Operation, Result, TextError, TextEvent, TreeText};
