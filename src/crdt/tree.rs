//! Arena-backed CRDT node tree.
//!
//! Every character is a node hanging off the node it was typed after. Nodes
//! live in one `Vec` and refer to each other by `NodeIdx`, so the parent
//! link is a plain index rather than an owning pointer. Slot 0 is the
//! virtual root shared by every replica.
//!
//! Children are kept in descending `NodeId` order. A depth-first pre-order
//! walk in that order yields the document's linear order, newest sibling
//! first.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::id::NodeId;
use crate::error::Error;
use crate::error::Result;

/// Index of a node in the arena.
pub type NodeIdx = u32;

/// Parent link of the root.
pub const NO_PARENT: NodeIdx = u32::MAX;

#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub ch: char,
    pub deleted: bool,
    pub parent: NodeIdx,
    /// Sorted by descending id.
    pub children: SmallVec<[NodeIdx; 2]>,
    /// Nodes in this subtree including this one, tombstones included.
    pub subtree_size: usize,
}

#[derive(Clone, Debug)]
pub struct NodeTree {
    nodes: Vec<Node>,
    index: FxHashMap<NodeId, NodeIdx>,
}

impl NodeTree {
    /// Arena slot of the virtual root.
    pub const ROOT: NodeIdx = 0;

    pub fn new() -> NodeTree {
        let root = Node {
            id: NodeId::ROOT,
            ch: '\0',
            deleted: true,
            parent: NO_PARENT,
            children: SmallVec::new(),
            subtree_size: 1,
        };
        let mut index = FxHashMap::default();
        index.insert(NodeId::ROOT, NodeTree::ROOT);
        return NodeTree {
            nodes: vec![root],
            index,
        };
    }

    /// Number of nodes, root included.
    #[inline(always)]
    pub fn len(&self) -> usize {
        return self.nodes.len();
    }

    #[inline(always)]
    pub fn get(&self, idx: NodeIdx) -> &Node {
        return &self.nodes[idx as usize];
    }

    #[inline(always)]
    pub fn lookup(&self, id: &NodeId) -> Option<NodeIdx> {
        return self.index.get(id).copied();
    }

    #[inline(always)]
    pub fn contains(&self, id: &NodeId) -> bool {
        return self.index.contains_key(id);
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        let idx = self.lookup(id)?;
        return Some(self.get(idx));
    }

    pub fn children(&self, idx: NodeIdx) -> &[NodeIdx] {
        return &self.nodes[idx as usize].children;
    }

    /// Create node `id` under `parent` and grow every ancestor's size by one.
    pub fn attach(&mut self, parent: NodeIdx, id: NodeId, ch: char) -> Result<NodeIdx> {
        if self.index.contains_key(&id) {
            return Err(Error::DuplicateElement(format!("{:?}", id)));
        }
        if parent as usize >= self.nodes.len() {
            return Err(Error::IndexOutOfBounds {
                index: parent as usize,
                len: self.nodes.len(),
            });
        }

        let idx = self.nodes.len() as NodeIdx;
        self.nodes.push(Node {
            id,
            ch,
            deleted: false,
            parent,
            children: SmallVec::new(),
            subtree_size: 1,
        });
        self.index.insert(id, idx);

        let nodes = &self.nodes;
        let siblings = &nodes[parent as usize].children;
        let slot = siblings.partition_point(|&c| nodes[c as usize].id > id);
        self.nodes[parent as usize].children.insert(slot, idx);

        let mut cursor = parent;
        while cursor != NO_PARENT {
            let node = &mut self.nodes[cursor as usize];
            node.subtree_size += 1;
            cursor = node.parent;
        }
        return Ok(idx);
    }

    /// Set the tombstone flag. Returns whether it changed.
    pub fn set_deleted(&mut self, idx: NodeIdx, deleted: bool) -> bool {
        let node = &mut self.nodes[idx as usize];
        if node.deleted == deleted {
            return false;
        }
        node.deleted = deleted;
        return true;
    }

    /// Pre-order walk in descending sibling order, root excluded.
    pub fn traverse(&self) -> Traverse<'_> {
        let mut stack: Vec<NodeIdx> = Vec::new();
        stack.extend(self.children(NodeTree::ROOT).iter().rev());
        return Traverse { tree: self, stack };
    }

    /// Check sizes, sibling order, parent links and the id index.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if !self.nodes[NodeTree::ROOT as usize].deleted {
            errors.push("root is not tombstoned".to_string());
        }
        if self.index.len() != self.nodes.len() {
            errors.push(format!("index has {} ids for {} nodes", self.index.len(), self.nodes.len()));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            let idx = i as NodeIdx;
            if self.index.get(&node.id) != Some(&idx) {
                errors.push(format!("{:?} is not indexed at {}", node.id, idx));
            }
            let mut expected = 1;
            for pair in node.children.windows(2) {
                if self.get(pair[0]).id <= self.get(pair[1]).id {
                    errors.push(format!("children of {:?} are not in descending order", node.id));
                }
            }
            for &child in &node.children {
                if self.get(child).parent != idx {
                    errors.push(format!("{:?} has a stale parent link", self.get(child).id));
                }
                expected += self.get(child).subtree_size;
            }
            if node.subtree_size != expected {
                errors.push(format!(
                    "{:?} records subtree size {} but has {}",
                    node.id, node.subtree_size, expected
                ));
            }
        }
        if errors.is_empty() {
            return Ok(());
        }
        return Err(Error::Corrupted(errors.join("\n")));
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        return Self::new();
    }
}

/// Explicit-stack pre-order iterator, so deep chains cannot overflow.
pub struct Traverse<'a> {
    tree: &'a NodeTree,
    stack: Vec<NodeIdx>,
}

impl<'a> Iterator for Traverse<'a> {
    type Item = NodeIdx;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.stack.pop()?;
        // Push smallest first so the largest child is visited next.
        self.stack.extend(self.tree.children(idx).iter().rev());
        return Some(idx);
    }
}
