//! Operations exchanged between replicas.
//!
//! Each operation names the nodes it touches by `NodeId`, never by
//! position, so it can be replayed on any replica in any order:
//! - Insert: "character `ch` is node `node`, a child of node `parent`"
//! - Delete: "node `target` is tombstoned"
//!
//! The order of a log carries no meaning. A replica only needs to see an
//! insert eventually; operations that depend on it are buffered meanwhile.

use rustc_hash::FxHashSet;
use serde::Deserialize;
use serde::Serialize;

use super::id::NodeId;
use crate::error::Error;
use crate::error::Result;

/// An operation that can be applied to a [`Document`](super::document::Document).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Op {
    /// Create `node` as a child of `parent`, carrying `ch`.
    Insert {
        parent: NodeId,
        node: NodeId,
        ch: char,
    },

    /// Tombstone `target`.
    Delete { target: NodeId },
}

impl Op {
    pub fn insert(parent: NodeId, node: NodeId, ch: char) -> Op {
        return Op::Insert { parent, node, ch };
    }

    pub fn delete(target: NodeId) -> Op {
        return Op::Delete { target };
    }

    /// The node whose existence this operation waits for: the parent of an
    /// insert, the target of a delete.
    pub fn dependency(&self) -> NodeId {
        match self {
            Op::Insert { parent, .. } => *parent,
            Op::Delete { target } => *target,
        }
    }

    /// Decode a loosely typed record, as a transport might hand it over.
    ///
    /// Unknown kinds point at a protocol or version mismatch and fail with
    /// [`Error::UnsupportedOperation`].
    pub fn from_record(record: &OpRecord) -> Result<Op> {
        match record.kind.as_str() {
            "insert" => {
                let parent = record
                    .parent
                    .ok_or_else(|| Error::MalformedOperation("insert without parent".to_string()))?;
                let ch = record
                    .ch
                    .ok_or_else(|| Error::MalformedOperation("insert without character".to_string()))?;
                return Ok(Op::insert(parent, record.node, ch));
            }
            "delete" => {
                return Ok(Op::delete(record.node));
            }
            other => {
                return Err(Error::UnsupportedOperation(other.to_string()));
            }
        }
    }

    /// Encode into the loosely typed record form.
    pub fn to_record(&self) -> OpRecord {
        match *self {
            Op::Insert { parent, node, ch } => {
                return OpRecord {
                    kind: "insert".to_string(),
                    parent: Some(parent),
                    node,
                    ch: Some(ch),
                };
            }
            Op::Delete { target } => {
                return OpRecord {
                    kind: "delete".to_string(),
                    parent: None,
                    node: target,
                    ch: None,
                };
            }
        }
    }
}

/// Flat, schema-free form of an operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpRecord {
    pub kind: String,
    #[serde(default)]
    pub parent: Option<NodeId>,
    pub node: NodeId,
    #[serde(default)]
    pub ch: Option<char>,
}

/// Every distinct operation a document has applied, in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct OpLog {
    ops: Vec<Op>,
    seen: FxHashSet<Op>,
}

impl OpLog {
    pub fn new() -> OpLog {
        return OpLog {
            ops: Vec::new(),
            seen: FxHashSet::default(),
        };
    }

    /// Record `op`. Returns false if it was already recorded.
    pub fn push(&mut self, op: Op) -> bool {
        if !self.seen.insert(op) {
            return false;
        }
        self.ops.push(op);
        return true;
    }

    pub fn contains(&self, op: &Op) -> bool {
        return self.seen.contains(op);
    }

    pub fn ops(&self) -> &[Op] {
        return &self.ops;
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        return self.ops.len();
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        return self.ops.is_empty();
    }
}
