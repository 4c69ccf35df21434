//! CRDT text document and the structures it is built from.

pub mod anchor;
pub mod document;
mod edit;
pub mod id;
pub mod linear;
pub mod op;
pub mod order_list;
pub mod tree;

use crate::error::Result;

/// A CRDT is a data type with a merge operator that is commutative,
/// associative, and idempotent.
pub trait Crdt {
    /// Merge another instance into this one.
    fn merge(&mut self, other: &Self) -> Result<()>;
}
