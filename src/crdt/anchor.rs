//! Stable positions.
//!
//! A numeric caret offset goes stale as soon as someone edits in front of
//! it. An [`Anchor`] instead names the character next to the caret and
//! which side of it the caret sits on, and is turned back into an offset
//! on demand by [`Document::resolve_anchor`](super::document::Document::resolve_anchor).

use serde::Deserialize;
use serde::Serialize;

use super::id::NodeId;

/// Which neighbor of a gap an anchor is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gravity {
    /// Bound to the character before the gap; the caret sits after it.
    Left,
    /// Bound to the character after the gap; the caret sits before it.
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Anchor {
    pub node: NodeId,
    pub gravity: Gravity,
}

impl Anchor {
    /// The start of the document.
    pub const START: Anchor = Anchor {
        node: NodeId::ROOT,
        gravity: Gravity::Left,
    };

    pub fn new(node: NodeId, gravity: Gravity) -> Anchor {
        return Anchor { node, gravity };
    }
}

/// Two resolved gap positions. `start` may be greater than `end`, as for a
/// selection made backwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn new(start: usize, end: usize) -> Range {
        return Range { start, end };
    }

    #[inline(always)]
    pub fn is_collapsed(&self) -> bool {
        return self.start == self.end;
    }

    #[inline(always)]
    pub fn is_reversed(&self) -> bool {
        return self.start > self.end;
    }

    /// The covered gaps in ascending order.
    pub fn ordered(&self) -> std::ops::Range<usize> {
        return self.start.min(self.end)..self.start.max(self.end);
    }
}
