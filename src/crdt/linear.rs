//! Linear order cache.
//!
//! Keeps an [`OrderList`] of arena indices in step with the node tree. When
//! a node is attached its position follows from the tree alone: right after
//! its parent, past the whole subtrees of every larger sibling.

use tracing::debug;

use super::order_list::Iter;
use super::order_list::OrderList;
use super::tree::NodeIdx;
use super::tree::NodeTree;
use crate::error::Error;
use crate::error::Result;

#[derive(Clone, Debug, Default)]
pub struct LinearOrder {
    list: OrderList<NodeIdx>,
}

impl LinearOrder {
    pub fn new(degree: usize) -> Result<LinearOrder> {
        return Ok(LinearOrder {
            list: OrderList::with_degree(degree)?,
        });
    }

    /// Rebuild from scratch by walking the tree.
    pub fn rebuild(tree: &NodeTree, degree: usize) -> Result<LinearOrder> {
        let mut order = LinearOrder::new(degree)?;
        for idx in tree.traverse() {
            order.list.push(idx)?;
            if tree.get(idx).deleted {
                order.list.set_visible(&idx, false);
            }
        }
        debug!(len = order.list.len(), visible = order.list.visible_len(), "rebuilt linear order");
        return Ok(order);
    }

    /// Where a freshly attached node belongs in the order.
    ///
    /// Siblings are stored in descending id order, so only the ones before
    /// `idx` in that list precede it, each with its whole subtree.
    pub fn insertion_index(&self, tree: &NodeTree, idx: NodeIdx) -> Result<usize> {
        let node = tree.get(idx);
        let parent = node.parent;
        let mut index = if parent == NodeTree::ROOT {
            0
        } else {
            let at = self.list.index_of(&parent).ok_or_else(|| {
                Error::Corrupted(format!("parent of {:?} is missing from the linear order", node.id))
            })?;
            at + 1
        };
        for &sibling in tree.children(parent) {
            let sibling = tree.get(sibling);
            if sibling.id <= node.id {
                break;
            }
            index += sibling.subtree_size;
        }
        return Ok(index);
    }

    /// Place a freshly attached node. Returns its position.
    pub fn insert_node(&mut self, tree: &NodeTree, idx: NodeIdx) -> Result<usize> {
        let index = self.insertion_index(tree, idx)?;
        self.list.insert(index, idx)?;
        if tree.get(idx).deleted {
            self.list.set_visible(&idx, false);
        }
        return Ok(index);
    }

    pub fn set_visible(&mut self, idx: NodeIdx, visible: bool) -> bool {
        return self.list.set_visible(&idx, visible);
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        return self.list.len();
    }

    #[inline(always)]
    pub fn visible_len(&self) -> usize {
        return self.list.visible_len();
    }

    pub fn nth(&self, index: usize) -> Option<NodeIdx> {
        return self.list.nth(index);
    }

    pub fn nth_visible(&self, index: usize) -> Option<NodeIdx> {
        return self.list.nth_visible(index);
    }

    pub fn index_of(&self, idx: NodeIdx) -> Option<usize> {
        return self.list.index_of(&idx);
    }

    pub fn index_of_visible(&self, idx: NodeIdx) -> Option<usize> {
        return self.list.index_of_visible(&idx);
    }

    pub fn visible_before(&self, idx: NodeIdx) -> Option<usize> {
        return self.list.visible_before(&idx);
    }

    pub fn iter(&self) -> Iter<'_, NodeIdx> {
        return self.list.iter();
    }

    pub fn iter_visible(&self) -> Iter<'_, NodeIdx> {
        return self.list.iter_visible();
    }

    /// Check the underlying list and that it mirrors the tree exactly.
    pub fn validate(&self, tree: &NodeTree) -> Result<()> {
        self.list.validate()?;
        let expected: Vec<NodeIdx> = tree.traverse().collect();
        if self.list.to_list() != expected {
            return Err(Error::Corrupted("linear order disagrees with tree traversal".to_string()));
        }
        for idx in expected {
            if self.list.is_visible(&idx) == tree.get(idx).deleted {
                return Err(Error::Corrupted(format!(
                    "visibility of {:?} disagrees with its tombstone",
                    tree.get(idx).id
                )));
            }
        }
        return Ok(());
    }
}
