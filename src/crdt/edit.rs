//! Local edits.
//!
//! Turns "type this text at offset X" and "delete [a, b)" into per-character
//! operations, applies them locally and hands them back for broadcast.

use super::document::Document;
use super::id::NodeId;
use super::op::Op;
use crate::error::Error;
use crate::error::Result;

impl Document {
    /// Insert `text` so that its first character lands at visible `offset`.
    ///
    /// The first character hangs off the character before the offset (the
    /// root at offset 0); every following one hangs off its predecessor.
    /// Fresh counters beat every id seen so far, so each new node sorts
    /// ahead of its parent's existing children.
    pub fn insert_text(&mut self, offset: usize, text: &str) -> Result<Vec<Op>> {
        let len = self.visible_len();
        if offset > len {
            return Err(Error::UnknownPosition { offset, len });
        }
        let mut parent = if offset == 0 {
            NodeId::ROOT
        } else {
            self.visible_node(offset - 1)
                .ok_or(Error::UnknownPosition { offset, len })?
        };

        let mut ops = Vec::with_capacity(text.len());
        for ch in text.chars() {
            let node = NodeId::new(self.site_id(), self.next_counter()?);
            let op = Op::insert(parent, node, ch);
            self.apply(op)?;
            ops.push(op);
            parent = node;
        }
        return Ok(ops);
    }

    /// Tombstone every visible character in `[start, end)`.
    pub fn delete_range(&mut self, start: usize, end: usize) -> Result<Vec<Op>> {
        if start >= end {
            return Ok(Vec::new());
        }
        let len = self.visible_len();
        if end > len {
            return Err(Error::UnknownPosition { offset: end, len });
        }
        // Collect first: every delete shifts the visible positions after it.
        let targets: Vec<NodeId> = (start..end).filter_map(|i| self.visible_node(i)).collect();
        let mut ops = Vec::with_capacity(targets.len());
        for target in targets {
            let op = Op::delete(target);
            self.apply(op)?;
            ops.push(op);
        }
        return Ok(ops);
    }
}
