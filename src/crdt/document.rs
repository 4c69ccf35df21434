//! Replicated text document.
//!
//! A `Document` owns one replica's node tree, its linear order and the
//! buffers for operations that arrived before what they depend on.
//!
//! # Applying operations
//!
//! Every operation names the node it waits for (see [`Op::dependency`]):
//! - If that node exists the operation takes effect immediately.
//! - Otherwise it is parked, keyed by the missing id, and replayed the
//!   moment an insert materializes that id.
//!
//! Inserts of an existing id and deletes of a tombstone change nothing, so
//! any replica that has seen the same set of operations, in any order and
//! with any repetition, renders the same text.
//!
//! # Anchors
//!
//! See [`anchor`](super::anchor). A tombstoned anchor node still has a
//! place in the full order, and the caret resolves to the gap at that
//! place: the number of visible characters before it.

use std::fmt;

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use tracing::debug;
use tracing::trace;

use super::Crdt;
use super::anchor::Anchor;
use super::anchor::Gravity;
use super::anchor::Range;
use super::id::NodeId;
use super::id::SiteId;
use super::linear::LinearOrder;
use super::op::Op;
use super::op::OpLog;
use super::op::OpRecord;
use super::tree::NO_PARENT;
use super::tree::NodeIdx;
use super::tree::NodeTree;
use crate::config::Config;
use crate::config::DEFAULT_DEGREE;
use crate::error::Error;
use crate::error::Result;

/// What a change notification reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Delete,
}

/// Delivered to listeners synchronously from inside [`Document::apply`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// The node that was materialized or tombstoned.
    pub node: NodeId,
}

type Listener = Box<dyn FnMut(&ChangeEvent)>;

pub struct Document {
    site: SiteId,
    /// Largest counter seen so far, from any site.
    counter: u64,
    degree: usize,
    tree: NodeTree,
    order: LinearOrder,
    /// Inserts waiting for their parent, keyed by the parent id.
    pending_inserts: FxHashMap<NodeId, Vec<(NodeId, char)>>,
    /// Deletes waiting for their target.
    pending_deletes: FxHashSet<NodeId>,
    log: OpLog,
    revision: u64,
    listeners: Vec<Listener>,
}

impl Document {
    /// An empty document with a fresh random site id.
    pub fn new() -> Document {
        return Document::build(SiteId::generate(), DEFAULT_DEGREE, LinearOrder::default());
    }

    pub fn with_config(config: Config) -> Result<Document> {
        config.validate()?;
        let site = config.site.unwrap_or_else(SiteId::generate);
        let order = LinearOrder::new(config.degree)?;
        return Ok(Document::build(site, config.degree, order));
    }

    fn build(site: SiteId, degree: usize, order: LinearOrder) -> Document {
        return Document {
            site,
            counter: 0,
            degree,
            tree: NodeTree::new(),
            order,
            pending_inserts: FxHashMap::default(),
            pending_deletes: FxHashSet::default(),
            log: OpLog::new(),
            revision: 0,
            listeners: Vec::new(),
        };
    }

    /// Build a document by applying `ops` in the given order.
    pub fn from_log<I: IntoIterator<Item = Op>>(ops: I) -> Result<Document> {
        let mut doc = Document::new();
        for op in ops {
            doc.apply(op)?;
        }
        return Ok(doc);
    }

    #[inline(always)]
    pub fn site_id(&self) -> SiteId {
        return self.site;
    }

    /// Number of `apply` calls that returned normally.
    #[inline(always)]
    pub fn revision(&self) -> u64 {
        return self.revision;
    }

    /// Allocate a counter larger than any seen so far.
    ///
    /// Fails once a node carrying `u64::MAX` has been seen: no later id
    /// could sort ahead of it.
    pub fn next_counter(&mut self) -> Result<u64> {
        self.counter = self.counter.checked_add(1).ok_or(Error::CounterExhausted)?;
        return Ok(self.counter);
    }

    pub fn register_change_listener<F: FnMut(&ChangeEvent) + 'static>(&mut self, listener: F) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&mut self, kind: ChangeKind, node: NodeId) {
        let event = ChangeEvent { kind, node };
        for listener in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    /// Apply one operation, buffering it if its dependency is missing.
    pub fn apply(&mut self, op: Op) -> Result<()> {
        let dependency = op.dependency();
        match op {
            Op::Insert { node, ch, .. } => {
                self.counter = self.counter.max(node.counter);
                self.apply_insert(dependency, node, ch)?;
            }
            Op::Delete { .. } => {
                self.apply_delete(dependency);
            }
        }
        self.log.push(op);
        self.revision += 1;
        return Ok(());
    }

    /// Decode and apply a loosely typed record.
    pub fn apply_record(&mut self, record: &OpRecord) -> Result<()> {
        let op = Op::from_record(record)?;
        return self.apply(op);
    }

    fn apply_insert(&mut self, parent: NodeId, node: NodeId, ch: char) -> Result<()> {
        if self.tree.contains(&node) {
            trace!(node = ?node, "duplicate insert absorbed");
            return Ok(());
        }
        let Some(parent_idx) = self.tree.lookup(&parent) else {
            debug!(parent = ?parent, node = ?node, "insert buffered until its parent arrives");
            self.pending_inserts.entry(parent).or_default().push((node, ch));
            return Ok(());
        };

        // Materializing a node can release inserts parked under it, which
        // can release more. A work stack keeps long chains off the call stack.
        let mut work: Vec<(NodeIdx, NodeId, char)> = vec![(parent_idx, node, ch)];
        while let Some((parent_idx, node, ch)) = work.pop() {
            if self.tree.contains(&node) {
                continue;
            }
            let idx = self.tree.attach(parent_idx, node, ch)?;
            self.order.insert_node(&self.tree, idx)?;
            self.notify(ChangeKind::Insert, node);

            if let Some(waiting) = self.pending_inserts.remove(&node) {
                debug!(parent = ?node, count = waiting.len(), "flushing buffered inserts");
                work.extend(waiting.into_iter().map(|(child, ch)| (idx, child, ch)));
            }
            if self.pending_deletes.remove(&node) {
                debug!(target = ?node, "flushing buffered delete");
                self.delete_node(idx);
            }
        }
        return Ok(());
    }

    fn apply_delete(&mut self, target: NodeId) {
        match self.tree.lookup(&target) {
            Some(idx) => self.delete_node(idx),
            None => {
                debug!(target = ?target, "delete buffered until its target arrives");
                self.pending_deletes.insert(target);
            }
        }
    }

    fn delete_node(&mut self, idx: NodeIdx) {
        if self.tree.set_deleted(idx, true) {
            self.order.set_visible(idx, false);
        }
        let id = self.tree.get(idx).id;
        self.notify(ChangeKind::Delete, id);
    }

    /// The visible text.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.order.visible_len());
        out.extend(self.order.iter_visible().map(|idx| self.tree.get(idx).ch));
        return out;
    }

    /// Number of visible characters.
    #[inline(always)]
    pub fn visible_len(&self) -> usize {
        return self.order.visible_len();
    }

    /// Number of materialized nodes including tombstones, root excluded.
    #[inline(always)]
    pub fn len(&self) -> usize {
        return self.order.len();
    }

    /// True when no node has materialized. A fully tombstoned document
    /// is not empty; check `visible_len` for blank text.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        return self.order.len() == 0;
    }

    /// Number of operations parked on a missing dependency.
    pub fn pending_len(&self) -> usize {
        let inserts: usize = self.pending_inserts.values().map(Vec::len).sum();
        return inserts + self.pending_deletes.len();
    }

    /// Every distinct applied operation, in the order this replica first saw them.
    pub fn operations(&self) -> &[Op] {
        return self.log.ops();
    }

    /// The id of the `index`-th visible character.
    pub fn visible_node(&self, index: usize) -> Option<NodeId> {
        let idx = self.order.nth_visible(index)?;
        return Some(self.tree.get(idx).id);
    }

    /// Position 0 is the root, position `p` the `p`-th node of the full order.
    pub fn node_at_position(&self, position: usize) -> Option<NodeId> {
        if position == 0 {
            return Some(NodeId::ROOT);
        }
        let idx = self.order.nth(position - 1)?;
        return Some(self.tree.get(idx).id);
    }

    pub fn index_of_visible(&self, id: &NodeId) -> Option<usize> {
        let idx = self.tree.lookup(id)?;
        return self.order.index_of_visible(idx);
    }

    /// All node ids in document order, tombstones included.
    pub fn linear_order(&self) -> Vec<NodeId> {
        return self.order.iter().map(|idx| self.tree.get(idx).id).collect();
    }

    pub fn visible_order(&self) -> Vec<NodeId> {
        return self.order.iter_visible().map(|idx| self.tree.get(idx).id).collect();
    }

    /// Node ids in tree pre-order. Always equal to [`linear_order`](Self::linear_order).
    pub fn traverse(&self) -> Vec<NodeId> {
        return self.tree.traverse().map(|idx| self.tree.get(idx).id).collect();
    }

    pub fn subtree_size(&self, id: &NodeId) -> Option<usize> {
        return self.tree.node(id).map(|node| node.subtree_size);
    }

    /// The node `id` hangs off. `None` for the root and for unknown ids.
    pub fn parent_of(&self, id: &NodeId) -> Option<NodeId> {
        let node = self.tree.node(id)?;
        if node.parent == NO_PARENT {
            return None;
        }
        return Some(self.tree.get(node.parent).id);
    }

    pub fn is_deleted(&self, id: &NodeId) -> Option<bool> {
        return self.tree.node(id).map(|node| node.deleted);
    }

    /// Discard the linear order and rebuild it from the tree.
    pub fn rebuild_linear_order(&mut self) -> Result<()> {
        self.order = LinearOrder::rebuild(&self.tree, self.degree)?;
        return Ok(());
    }

    /// Check the tree, the order list and that they agree.
    pub fn validate(&self) -> Result<()> {
        self.tree.validate()?;
        return self.order.validate(&self.tree);
    }

    /// Bind the gap at `caret` to a neighboring character.
    ///
    /// At either end only one neighbor exists, so the gravity there is
    /// always `Left`.
    pub fn create_anchor(&self, caret: usize, gravity: Gravity) -> Anchor {
        let len = self.visible_len();
        if len == 0 || caret == 0 {
            return Anchor::START;
        }
        if caret >= len {
            return match self.visible_node(len - 1) {
                Some(last) => Anchor::new(last, Gravity::Left),
                None => Anchor::START,
            };
        }
        let bound = match gravity {
            Gravity::Left => self.visible_node(caret - 1),
            Gravity::Right => self.visible_node(caret),
        };
        return match bound {
            Some(node) => Anchor::new(node, gravity),
            None => Anchor::START,
        };
    }

    /// The current gap index of `anchor`. Unknown nodes resolve to 0.
    pub fn resolve_anchor(&self, anchor: &Anchor) -> usize {
        let Some(idx) = self.tree.lookup(&anchor.node) else {
            return 0;
        };
        if idx == NodeTree::ROOT {
            return 0;
        }
        if let Some(index) = self.order.index_of_visible(idx) {
            return match anchor.gravity {
                Gravity::Left => index + 1,
                Gravity::Right => index,
            };
        }
        // Hidden: the nearest visible neighbor in either direction bounds
        // the same gap.
        return self.order.visible_before(idx).unwrap_or(0);
    }

    pub fn resolve_range(&self, start: &Anchor, end: &Anchor) -> Range {
        return Range::new(self.resolve_anchor(start), self.resolve_anchor(end));
    }
}

impl Default for Document {
    fn default() -> Self {
        return Self::new();
    }
}

impl Crdt for Document {
    /// Apply every operation `other` has seen and this replica has not.
    fn merge(&mut self, other: &Self) -> Result<()> {
        for op in other.operations() {
            if self.log.contains(op) {
                continue;
            }
            self.apply(*op)?;
        }
        return Ok(());
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("Document")
            .field("site", &self.site)
            .field("revision", &self.revision)
            .field("len", &self.len())
            .field("visible_len", &self.visible_len())
            .field("pending", &self.pending_len())
            .field("listeners", &self.listeners.len())
            .finish();
    }
}
