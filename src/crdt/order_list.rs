//! Order-Statistics List
//!
//! A sequence of element handles kept in a B+ tree that counts, per subtree,
//! both all elements and the visible ones. Every element stays in the list
//! forever; hiding one only flips its visibility bit.
//!
//! Structure:
//! - Leaves store up to `2t - 1` elements plus a visibility bitmap
//! - Branches store up to `2t` children with per-child total and visible counts
//! - Leaves are chained left to right for linear scans
//! - A side table maps each element to its (leaf, offset), so positions are
//!   computed on demand instead of being stored on the element
//! - All nodes live in Vecs (no raw pointers)
//!
//! Operations:
//! - get / get_visible: O(log n) - descend by total or visible counts
//! - insert: O(log n) amortized - full children are split on the way down
//! - index_of / index_of_visible: O(log n) - climb from the leaf, summing
//!   the counts of left siblings at every level
//! - set_visible: O(log n) - flip one bit, propagate a +-1 delta upward

use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::trace;

use crate::config::DEFAULT_DEGREE;
use crate::config::MIN_DEGREE;
use crate::error::Error;
use crate::error::Result;

/// Index into the leaf array.
type LeafIdx = u32;
/// Index into the branch array.
type BranchIdx = u32;
/// Sentinel value for no parent / no next leaf.
const NONE: u32 = u32::MAX;

/// Visibility bitmap of a single leaf.
#[derive(Clone, Debug, Default)]
struct Bits {
    words: SmallVec<[u64; 1]>,
    len: usize,
}

impl Bits {
    fn new() -> Bits {
        return Bits {
            words: SmallVec::new(),
            len: 0,
        };
    }

    #[inline(always)]
    fn get(&self, index: usize) -> bool {
        return (self.words[index / 64] >> (index % 64)) & 1 == 1;
    }

    #[inline(always)]
    fn set(&mut self, index: usize, bit: bool) {
        let mask = 1u64 << (index % 64);
        if bit {
            self.words[index / 64] |= mask;
        } else {
            self.words[index / 64] &= !mask;
        }
    }

    /// Insert a bit at `index`, shifting everything after it up by one.
    fn insert(&mut self, index: usize, bit: bool) {
        debug_assert!(index <= self.len);
        if self.len % 64 == 0 {
            self.words.push(0);
        }
        let word = index / 64;
        let last = self.words.len() - 1;
        for i in (word + 1..=last).rev() {
            let carry = self.words[i - 1] >> 63;
            self.words[i] = (self.words[i] << 1) | carry;
        }
        let shift = index % 64;
        let low_mask = (1u64 << shift) - 1;
        let current = self.words[word];
        let low = current & low_mask;
        let high = (current & !low_mask) << 1;
        self.words[word] = high | low | ((bit as u64) << shift);
        self.len += 1;
    }

    fn push(&mut self, bit: bool) {
        self.insert(self.len, bit);
    }

    /// Number of set bits.
    fn count(&self) -> usize {
        return self.words.iter().map(|w| w.count_ones() as usize).sum();
    }

    /// Number of set bits strictly before `index`.
    fn count_before(&self, index: usize) -> usize {
        let full = index / 64;
        let mut count: usize = self.words[..full].iter().map(|w| w.count_ones() as usize).sum();
        let rem = index % 64;
        if rem > 0 {
            count += (self.words[full] & ((1u64 << rem) - 1)).count_ones() as usize;
        }
        return count;
    }

    /// Position of the `n`-th set bit.
    fn select(&self, n: usize) -> Option<usize> {
        let mut remaining = n;
        for (i, &word) in self.words.iter().enumerate() {
            let ones = word.count_ones() as usize;
            if remaining < ones {
                let mut word = word;
                for _ in 0..remaining {
                    word &= word - 1;
                }
                return Some(i * 64 + word.trailing_zeros() as usize);
            }
            remaining -= ones;
        }
        return None;
    }

    fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        self.words.truncate(len.div_ceil(64));
        let rem = len % 64;
        if rem > 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
        self.len = len;
    }

    /// Split off the bits from `at` onwards.
    fn split_off(&mut self, at: usize) -> Bits {
        let mut right = Bits::new();
        for i in at..self.len {
            right.push(self.get(i));
        }
        self.truncate(at);
        return right;
    }
}

/// A leaf holding elements and their visibility.
#[derive(Clone, Debug)]
struct Leaf<K> {
    items: Vec<K>,
    bits: Bits,
    /// Number of set bits in `bits`.
    visible: usize,
    /// Parent branch (NONE for the root leaf).
    parent: BranchIdx,
    /// Slot of this leaf in the parent's children.
    index_in_parent: u32,
    /// Next leaf in sequence order.
    next: LeafIdx,
}

impl<K: Copy> Leaf<K> {
    fn new(capacity: usize) -> Leaf<K> {
        return Leaf {
            items: Vec::with_capacity(capacity),
            bits: Bits::new(),
            visible: 0,
            parent: NONE,
            index_in_parent: 0,
            next: NONE,
        };
    }

    #[inline(always)]
    fn len(&self) -> usize {
        return self.items.len();
    }

    /// Split this leaf at its midpoint, returning the right half.
    fn split(&mut self) -> Leaf<K> {
        let mid = self.items.len() / 2;
        let items: Vec<K> = self.items.drain(mid..).collect();
        let bits = self.bits.split_off(mid);
        let visible = bits.count();
        self.visible -= visible;
        return Leaf {
            items,
            bits,
            visible,
            parent: NONE,
            index_in_parent: 0,
            next: NONE,
        };
    }
}

/// An internal node with per-child counts.
#[derive(Clone, Debug)]
struct Branch {
    /// Child indices. At height 1 these are leaves, above that branches.
    children: Vec<u32>,
    /// Element count of each child's subtree.
    child_counts: Vec<usize>,
    /// Visible element count of each child's subtree.
    child_visible: Vec<usize>,
    total_count: usize,
    total_visible: usize,
    parent: BranchIdx,
    index_in_parent: u32,
}

impl Branch {
    fn new(capacity: usize) -> Branch {
        return Branch {
            children: Vec::with_capacity(capacity),
            child_counts: Vec::with_capacity(capacity),
            child_visible: Vec::with_capacity(capacity),
            total_count: 0,
            total_visible: 0,
            parent: NONE,
            index_in_parent: 0,
        };
    }

    /// Find the child holding the element at `index` among the counts given.
    /// Returns (child_slot, index_in_child).
    #[inline]
    fn find_child(counts: &[usize], index: usize) -> (usize, usize) {
        let mut cumulative = 0usize;
        for (i, &count) in counts.iter().enumerate() {
            let next = cumulative + count;
            if next > index {
                return (i, index - cumulative);
            }
            cumulative = next;
        }
        let last = counts.len().saturating_sub(1);
        return (last, index - cumulative + counts[last]);
    }

    /// Find the child an insert at `index` descends into. Boundaries go left.
    #[inline]
    fn child_for_insert(&self, index: usize) -> (usize, usize) {
        let mut cumulative = 0usize;
        for (i, &count) in self.child_counts.iter().enumerate() {
            if index <= cumulative + count {
                return (i, index - cumulative);
            }
            cumulative += count;
        }
        let last = self.children.len() - 1;
        return (last, self.child_counts[last]);
    }

    /// Split this branch at its midpoint, returning the right half.
    fn split(&mut self) -> Branch {
        let mid = self.children.len() / 2;
        let children: Vec<u32> = self.children.drain(mid..).collect();
        let child_counts: Vec<usize> = self.child_counts.drain(mid..).collect();
        let child_visible: Vec<usize> = self.child_visible.drain(mid..).collect();
        let total_count: usize = child_counts.iter().sum();
        let total_visible: usize = child_visible.iter().sum();
        self.total_count -= total_count;
        self.total_visible -= total_visible;
        return Branch {
            children,
            child_counts,
            child_visible,
            total_count,
            total_visible,
            parent: NONE,
            index_in_parent: 0,
        };
    }
}

/// Where an element lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Location {
    leaf: LeafIdx,
    offset: u32,
}

/// An ordered list of unique element handles with all-element and
/// visible-element order statistics.
#[derive(Clone, Debug)]
pub struct OrderList<K> {
    degree: usize,
    leaves: Vec<Leaf<K>>,
    nodes: Vec<Branch>,
    /// If height == 0 this is a LeafIdx, otherwise a BranchIdx.
    root: u32,
    /// 0 means the root is a leaf.
    height: usize,
    /// Leftmost leaf, start of the leaf chain.
    head: LeafIdx,
    len: usize,
    visible: usize,
    locations: FxHashMap<K, Location>,
}

impl<K: Copy + Eq + Hash + Debug> OrderList<K> {
    pub fn new() -> OrderList<K> {
        return OrderList::build(DEFAULT_DEGREE);
    }

    /// Create a list with minimum degree `degree` (at least 2).
    pub fn with_degree(degree: usize) -> Result<OrderList<K>> {
        if degree < MIN_DEGREE {
            return Err(Error::InvalidDegree(degree));
        }
        return Ok(OrderList::build(degree));
    }

    fn build(degree: usize) -> OrderList<K> {
        let mut leaves = Vec::new();
        leaves.push(Leaf::new(2 * degree - 1));
        return OrderList {
            degree,
            leaves,
            nodes: Vec::new(),
            root: 0,
            height: 0,
            head: 0,
            len: 0,
            visible: 0,
            locations: FxHashMap::default(),
        };
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        return self.len;
    }

    #[inline(always)]
    pub fn visible_len(&self) -> usize {
        return self.visible;
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        return self.len == 0;
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        return self.height;
    }

    #[inline(always)]
    pub fn degree(&self) -> usize {
        return self.degree;
    }

    #[inline(always)]
    fn max_items(&self) -> usize {
        return 2 * self.degree - 1;
    }

    #[inline(always)]
    fn max_children(&self) -> usize {
        return 2 * self.degree;
    }

    pub fn contains(&self, key: &K) -> bool {
        return self.locations.contains_key(key);
    }

    /// Whether `key` is present and visible.
    pub fn is_visible(&self, key: &K) -> bool {
        return match self.locations.get(key) {
            Some(loc) => self.leaves[loc.leaf as usize].bits.get(loc.offset as usize),
            None => false,
        };
    }

    /// Descend to the leaf holding position `index`, counting all elements
    /// or only visible ones. Returns (leaf_idx, index_in_leaf).
    fn locate(&self, index: usize, visible: bool) -> (LeafIdx, usize) {
        let mut idx = self.root;
        let mut offset = index;
        let mut height = self.height;
        while height > 0 {
            let node = &self.nodes[idx as usize];
            let counts = if visible { &node.child_visible } else { &node.child_counts };
            let (slot, in_child) = Branch::find_child(counts, offset);
            idx = node.children[slot];
            offset = in_child;
            height -= 1;
        }
        return (idx, offset);
    }

    /// The element at `index` among all elements.
    pub fn nth(&self, index: usize) -> Option<K> {
        if index >= self.len {
            return None;
        }
        let (leaf, offset) = self.locate(index, false);
        return self.leaves[leaf as usize].items.get(offset).copied();
    }

    /// The element at `index` among visible elements.
    pub fn nth_visible(&self, index: usize) -> Option<K> {
        if index >= self.visible {
            return None;
        }
        let (leaf, nth) = self.locate(index, true);
        let leaf = &self.leaves[leaf as usize];
        let offset = leaf.bits.select(nth)?;
        return leaf.items.get(offset).copied();
    }

    /// Like [`nth`](Self::nth), failing with a bounds error.
    pub fn get(&self, index: usize) -> Result<K> {
        return self.nth(index).ok_or(Error::IndexOutOfBounds { index, len: self.len });
    }

    /// Like [`nth_visible`](Self::nth_visible), failing with a bounds error.
    pub fn get_visible(&self, index: usize) -> Result<K> {
        return self.nth_visible(index).ok_or(Error::IndexOutOfBounds {
            index,
            len: self.visible,
        });
    }

    /// Insert `key` at `index` among all elements. New elements are visible.
    pub fn insert(&mut self, index: usize, key: K) -> Result<()> {
        if index > self.len {
            return Err(Error::IndexOutOfBounds { index, len: self.len });
        }
        if self.locations.contains_key(&key) {
            return Err(Error::DuplicateElement(format!("{:?}", key)));
        }

        if self.is_full(self.root, self.height) {
            self.grow_root();
        }

        let mut idx = self.root;
        let mut offset = index;
        let mut height = self.height;
        while height > 0 {
            let (mut slot, mut in_child) = self.nodes[idx as usize].child_for_insert(offset);
            let child = self.nodes[idx as usize].children[slot];
            if self.is_full(child, height - 1) {
                self.split_child(idx, slot, height - 1);
                let left_count = self.nodes[idx as usize].child_counts[slot];
                if in_child > left_count {
                    in_child -= left_count;
                    slot += 1;
                }
            }
            let node = &mut self.nodes[idx as usize];
            node.child_counts[slot] += 1;
            node.child_visible[slot] += 1;
            node.total_count += 1;
            node.total_visible += 1;
            idx = node.children[slot];
            offset = in_child;
            height -= 1;
        }

        let leaf = &mut self.leaves[idx as usize];
        leaf.items.insert(offset, key);
        leaf.bits.insert(offset, true);
        leaf.visible += 1;
        for (i, moved) in leaf.items[offset..].iter().enumerate() {
            let loc = Location {
                leaf: idx,
                offset: (offset + i) as u32,
            };
            self.locations.insert(*moved, loc);
        }

        self.len += 1;
        self.visible += 1;
        return Ok(());
    }

    /// Append `key` at the end.
    pub fn push(&mut self, key: K) -> Result<()> {
        return self.insert(self.len, key);
    }

    /// Append every key in order.
    pub fn extend<I: IntoIterator<Item = K>>(&mut self, keys: I) -> Result<()> {
        for key in keys {
            self.push(key)?;
        }
        return Ok(());
    }

    /// Replace the element at `index`, keeping its visibility.
    /// Returns the element that was replaced.
    pub fn set(&mut self, index: usize, key: K) -> Result<K> {
        if index >= self.len {
            return Err(Error::IndexOutOfBounds { index, len: self.len });
        }
        let (leaf, offset) = self.locate(index, false);
        let old = self.leaves[leaf as usize].items[offset];
        if old == key {
            return Ok(old);
        }
        if self.locations.contains_key(&key) {
            return Err(Error::DuplicateElement(format!("{:?}", key)));
        }
        self.leaves[leaf as usize].items[offset] = key;
        self.locations.remove(&old);
        self.locations.insert(
            key,
            Location {
                leaf,
                offset: offset as u32,
            },
        );
        return Ok(old);
    }

    fn is_full(&self, idx: u32, height: usize) -> bool {
        if height == 0 {
            return self.leaves[idx as usize].len() >= self.max_items();
        }
        return self.nodes[idx as usize].children.len() >= self.max_children();
    }

    /// Put a new branch above the root and split the old root under it.
    fn grow_root(&mut self) {
        let old_root = self.root;
        let new_root = self.nodes.len() as BranchIdx;

        let mut branch = Branch::new(self.max_children());
        branch.children.push(old_root);
        branch.child_counts.push(self.len);
        branch.child_visible.push(self.visible);
        branch.total_count = self.len;
        branch.total_visible = self.visible;
        self.nodes.push(branch);

        if self.height == 0 {
            self.leaves[old_root as usize].parent = new_root;
            self.leaves[old_root as usize].index_in_parent = 0;
        } else {
            self.nodes[old_root as usize].parent = new_root;
            self.nodes[old_root as usize].index_in_parent = 0;
        }

        self.root = new_root;
        self.height += 1;
        self.split_child(new_root, 0, self.height - 1);
        trace!(height = self.height, len = self.len, "order list grew a level");
    }

    /// Split the full child in `slot` of `parent`. Counts of `parent` are
    /// unchanged since elements only move between siblings.
    fn split_child(&mut self, parent: BranchIdx, slot: usize, child_height: usize) {
        let child = self.nodes[parent as usize].children[slot];

        let left_count;
        let left_visible;
        let right_count;
        let right_visible;
        let right_idx;

        if child_height == 0 {
            let mut right = self.leaves[child as usize].split();
            right_idx = self.leaves.len() as LeafIdx;
            right.parent = parent;
            right.next = self.leaves[child as usize].next;
            for (i, moved) in right.items.iter().enumerate() {
                let loc = Location {
                    leaf: right_idx,
                    offset: i as u32,
                };
                self.locations.insert(*moved, loc);
            }
            right_count = right.len();
            right_visible = right.visible;
            self.leaves.push(right);

            let left = &mut self.leaves[child as usize];
            left.next = right_idx;
            left_count = left.len();
            left_visible = left.visible;
        } else {
            let mut right = self.nodes[child as usize].split();
            right_idx = self.nodes.len() as BranchIdx;
            right.parent = parent;
            for (i, &grandchild) in right.children.iter().enumerate() {
                if child_height == 1 {
                    self.leaves[grandchild as usize].parent = right_idx;
                    self.leaves[grandchild as usize].index_in_parent = i as u32;
                } else {
                    self.nodes[grandchild as usize].parent = right_idx;
                    self.nodes[grandchild as usize].index_in_parent = i as u32;
                }
            }
            right_count = right.total_count;
            right_visible = right.total_visible;
            self.nodes.push(right);

            let left = &self.nodes[child as usize];
            left_count = left.total_count;
            left_visible = left.total_visible;
        }

        let node = &mut self.nodes[parent as usize];
        node.child_counts[slot] = left_count;
        node.child_visible[slot] = left_visible;
        node.children.insert(slot + 1, right_idx);
        node.child_counts.insert(slot + 1, right_count);
        node.child_visible.insert(slot + 1, right_visible);

        for i in (slot + 1)..self.nodes[parent as usize].children.len() {
            let sibling = self.nodes[parent as usize].children[i] as usize;
            if child_height == 0 {
                self.leaves[sibling].parent = parent;
                self.leaves[sibling].index_in_parent = i as u32;
            } else {
                self.nodes[sibling].parent = parent;
                self.nodes[sibling].index_in_parent = i as u32;
            }
        }
    }

    /// Sum the counts of every subtree left of the path from `parent`/`slot`
    /// up to the root.
    fn count_left_of(&self, mut parent: BranchIdx, mut slot: u32, visible: bool) -> usize {
        let mut total = 0usize;
        while parent != NONE {
            let node = &self.nodes[parent as usize];
            let counts = if visible { &node.child_visible } else { &node.child_counts };
            total += counts[..slot as usize].iter().sum::<usize>();
            slot = node.index_in_parent;
            parent = node.parent;
        }
        return total;
    }

    /// Position of `key` among all elements.
    pub fn index_of(&self, key: &K) -> Option<usize> {
        let loc = self.locations.get(key)?;
        let leaf = &self.leaves[loc.leaf as usize];
        let left = self.count_left_of(leaf.parent, leaf.index_in_parent, false);
        return Some(left + loc.offset as usize);
    }

    /// Number of visible elements strictly before `key`, whether or not `key`
    /// itself is visible.
    pub fn visible_before(&self, key: &K) -> Option<usize> {
        let loc = self.locations.get(key)?;
        let leaf = &self.leaves[loc.leaf as usize];
        let in_leaf = leaf.bits.count_before(loc.offset as usize);
        let left = self.count_left_of(leaf.parent, leaf.index_in_parent, true);
        return Some(left + in_leaf);
    }

    /// Position of `key` among visible elements. `None` if absent or hidden.
    pub fn index_of_visible(&self, key: &K) -> Option<usize> {
        if !self.is_visible(key) {
            return None;
        }
        return self.visible_before(key);
    }

    /// Show or hide `key`. Returns whether anything changed.
    pub fn set_visible(&mut self, key: &K, visible: bool) -> bool {
        let Some(&loc) = self.locations.get(key) else {
            return false;
        };
        let leaf = &mut self.leaves[loc.leaf as usize];
        let offset = loc.offset as usize;
        if leaf.bits.get(offset) == visible {
            return false;
        }
        leaf.bits.set(offset, visible);
        if visible {
            leaf.visible += 1;
        } else {
            leaf.visible -= 1;
        }

        let mut parent = leaf.parent;
        let mut slot = leaf.index_in_parent as usize;
        while parent != NONE {
            let node = &mut self.nodes[parent as usize];
            if visible {
                node.child_visible[slot] += 1;
                node.total_visible += 1;
            } else {
                node.child_visible[slot] -= 1;
                node.total_visible -= 1;
            }
            slot = node.index_in_parent as usize;
            parent = node.parent;
        }

        if visible {
            self.visible += 1;
        } else {
            self.visible -= 1;
        }
        return true;
    }

    /// All elements in order, by walking the leaf chain.
    pub fn iter(&self) -> Iter<'_, K> {
        return Iter {
            list: self,
            leaf: self.head,
            offset: 0,
            visible_only: false,
        };
    }

    /// Visible elements in order.
    pub fn iter_visible(&self) -> Iter<'_, K> {
        return Iter {
            list: self,
            leaf: self.head,
            offset: 0,
            visible_only: true,
        };
    }

    pub fn to_list(&self) -> Vec<K> {
        let mut out = Vec::with_capacity(self.len);
        out.extend(self.iter());
        return out;
    }

    pub fn to_visible_list(&self) -> Vec<K> {
        let mut out = Vec::with_capacity(self.visible);
        out.extend(self.iter_visible());
        return out;
    }

    /// Check every structural invariant, reporting all violations at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        let mut leaf_order = Vec::new();
        let mut branches = 0usize;

        let (count, visible) = self.validate_subtree(
            self.root,
            self.height,
            true,
            &mut leaf_order,
            &mut branches,
            &mut errors,
        );
        if count != self.len {
            errors.push(format!("root count {} != len {}", count, self.len));
        }
        if visible != self.visible {
            errors.push(format!("root visible count {} != visible len {}", visible, self.visible));
        }
        if leaf_order.len() != self.leaves.len() {
            errors.push(format!(
                "{} leaves reachable but {} allocated",
                leaf_order.len(),
                self.leaves.len()
            ));
        }
        if branches != self.nodes.len() {
            errors.push(format!("{} branches reachable but {} allocated", branches, self.nodes.len()));
        }
        if self.locations.len() != self.len {
            errors.push(format!("side table has {} entries for {} elements", self.locations.len(), self.len));
        }

        let mut chain = Vec::with_capacity(leaf_order.len());
        let mut cursor = self.head;
        while cursor != NONE {
            if chain.len() > self.leaves.len() {
                errors.push("leaf chain does not terminate".to_string());
                break;
            }
            chain.push(cursor);
            cursor = self.leaves[cursor as usize].next;
        }
        if chain != leaf_order {
            errors.push("leaf chain disagrees with tree order".to_string());
        }

        if errors.is_empty() {
            return Ok(());
        }
        return Err(Error::Corrupted(errors.join("\n")));
    }

    /// `validate` as a boolean.
    pub fn is_valid(&self) -> bool {
        return self.validate().is_ok();
    }

    /// Returns the (total, visible) counts found under `idx`.
    fn validate_subtree(
        &self,
        idx: u32,
        height: usize,
        is_root: bool,
        leaf_order: &mut Vec<LeafIdx>,
        branches: &mut usize,
        errors: &mut Vec<String>,
    ) -> (usize, usize) {
        if height == 0 {
            let leaf = &self.leaves[idx as usize];
            leaf_order.push(idx);
            if leaf.len() > self.max_items() {
                errors.push(format!("leaf {} holds {} > {} items", idx, leaf.len(), self.max_items()));
            }
            if !is_root && leaf.items.is_empty() {
                errors.push(format!("non-root leaf {} is empty", idx));
            }
            if leaf.bits.len != leaf.len() {
                errors.push(format!("leaf {} bitmap has {} bits for {} items", idx, leaf.bits.len, leaf.len()));
            }
            if leaf.bits.count() != leaf.visible {
                errors.push(format!(
                    "leaf {} visible count {} != bitmap count {}",
                    idx,
                    leaf.visible,
                    leaf.bits.count()
                ));
            }
            for (i, key) in leaf.items.iter().enumerate() {
                let expected = Location {
                    leaf: idx,
                    offset: i as u32,
                };
                if self.locations.get(key) != Some(&expected) {
                    errors.push(format!("side table entry for {:?} does not point at leaf {} offset {}", key, idx, i));
                }
            }
            return (leaf.len(), leaf.visible);
        }

        *branches += 1;
        let node = &self.nodes[idx as usize];
        let arity = node.children.len();
        if arity == 0 {
            errors.push(format!("branch {} has no children", idx));
            return (0, 0);
        }
        if !is_root && arity < 2 {
            errors.push(format!("non-root branch {} has {} child", idx, arity));
        }
        if arity > self.max_children() {
            errors.push(format!("branch {} has {} > {} children", idx, arity, self.max_children()));
        }
        if node.child_counts.len() != arity || node.child_visible.len() != arity {
            errors.push(format!("branch {} count arrays do not match its children", idx));
            return (node.total_count, node.total_visible);
        }

        let mut total = 0usize;
        let mut total_visible = 0usize;
        for (slot, &child) in node.children.iter().enumerate() {
            let (parent, index_in_parent) = if height == 1 {
                let leaf = &self.leaves[child as usize];
                (leaf.parent, leaf.index_in_parent)
            } else {
                let branch = &self.nodes[child as usize];
                (branch.parent, branch.index_in_parent)
            };
            if parent != idx || index_in_parent as usize != slot {
                errors.push(format!("child {} of branch {} has a stale parent link", slot, idx));
            }
            let (count, visible) = self.validate_subtree(child, height - 1, false, leaf_order, branches, errors);
            if count != node.child_counts[slot] {
                errors.push(format!(
                    "branch {} slot {} records {} elements, subtree has {}",
                    idx, slot, node.child_counts[slot], count
                ));
            }
            if visible != node.child_visible[slot] {
                errors.push(format!(
                    "branch {} slot {} records {} visible, subtree has {}",
                    idx, slot, node.child_visible[slot], visible
                ));
            }
            total += count;
            total_visible += visible;
        }
        if total != node.total_count || total_visible != node.total_visible {
            errors.push(format!("branch {} totals disagree with its children", idx));
        }
        if node.total_visible > node.total_count {
            errors.push(format!("branch {} has more visible than total elements", idx));
        }
        return (total, total_visible);
    }
}

impl<K: Copy + Eq + Hash + Debug> Default for OrderList<K> {
    fn default() -> Self {
        return Self::new();
    }
}

/// Iterator over an [`OrderList`] along the leaf chain.
pub struct Iter<'a, K> {
    list: &'a OrderList<K>,
    leaf: LeafIdx,
    offset: usize,
    visible_only: bool,
}

impl<'a, K: Copy> Iterator for Iter<'a, K> {
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        while self.leaf != NONE {
            let leaf = &self.list.leaves[self.leaf as usize];
            while self.offset < leaf.items.len() {
                let offset = self.offset;
                self.offset += 1;
                if !self.visible_only || leaf.bits.get(offset) {
                    return Some(leaf.items[offset]);
                }
            }
            self.leaf = leaf.next;
            self.offset = 0;
        }
        return None;
    }
}
