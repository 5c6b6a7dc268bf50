//! Error types for the tree-text CRDT.

use thiserror::Error;

use crate::crdt::types::UniqueId;

/// Errors that can occur while editing or applying operations.
///
/// Operation handlers are all-or-nothing: once `UnknownId` or
/// `InvariantViolation` comes out of the apply path, the replica's state can
/// no longer be trusted and the stream that fed it should be treated as
/// corrupted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TextError {
    #[error("Index out of bounds: {index} (length: {length})")]
    IndexOutOfBounds { index: usize, length: usize },

    #[error("Unknown node id: {0}")]
    UnknownId(UniqueId),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Codec error: {0}")]
    Codec(String),
}

impl From<serde_json::Error> for TextError {
    fn from(err: serde_json::Error) -> Self {
        TextError::Codec(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TextError>;
