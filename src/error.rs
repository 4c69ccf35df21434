//! Error types for document and sequence operations.
//!
//! Only local misuse surfaces as an error: bad indices, bad configuration,
//! operation records of an unknown kind. Causally incomplete operations,
//! duplicates and anchors on unknown nodes are absorbed by the document
//! and never reach the caller.

use thiserror::Error;

/// Errors produced by `strand`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("offset {offset} is not a gap position in a document of {len} visible characters")]
    UnknownPosition { offset: usize, len: usize },

    #[error("degree must be at least 2, got {0}")]
    InvalidDegree(usize),

    #[error("element already present in the sequence: {0}")]
    DuplicateElement(String),

    #[error("unsupported operation kind: {0}")]
    UnsupportedOperation(String),

    #[error("node counter exhausted")]
    CounterExhausted,

    #[error("malformed operation: {0}")]
    MalformedOperation(String),

    #[error("internal structure corrupted:\n{0}")]
    Corrupted(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
