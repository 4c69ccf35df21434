//! Identifier types for replicas and tree nodes.
//!
//! # Ordering
//!
//! `NodeId` is totally ordered by counter first and site second. The order
//! is computed locally from the two values alone, so every replica agrees
//! on it without coordination. It is the only tie-break between concurrent
//! siblings, which is what makes the tree shape independent of arrival order.

use std::cmp::Ordering;
use std::fmt;

use rand_core::OsRng;
use rand_core::RngCore;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

/// A 128-bit replica identifier.
///
/// Serialized as its hyphenated hex form so formats without native 128-bit
/// integers can carry it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SiteId(pub u128);

impl SiteId {
    /// The all-zero site shared by every replica's virtual root.
    pub const ROOT: SiteId = SiteId(0);

    /// Draw a random site identifier from the operating system.
    pub fn generate() -> SiteId {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        return SiteId(u128::from_be_bytes(bytes));
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        return write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            (v >> 96) as u32,
            (v >> 80) as u16,
            (v >> 64) as u16,
            (v >> 48) as u16,
            v & 0xffff_ffff_ffff,
        );
    }
}

impl std::str::FromStr for SiteId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<SiteId, Self::Err> {
        let hex: String = s.chars().filter(|c| *c != '-').collect();
        return u128::from_str_radix(&hex, 16).map(SiteId);
    }
}

impl Serialize for SiteId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        return serializer.collect_str(self);
    }
}

impl<'de> Deserialize<'de> for SiteId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<SiteId, D::Error> {
        let text = String::deserialize(deserializer)?;
        return text.parse().map_err(serde::de::Error::custom);
    }
}

impl fmt::Debug for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "SiteId({})", self);
    }
}

/// Names a node in the document tree.
///
/// The (site, counter) pair is globally unique as long as every site hands
/// out strictly increasing counters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// The replica that created the node.
    pub site: SiteId,
    /// Per-replica monotonic counter.
    pub counter: u64,
}

impl NodeId {
    /// The virtual root every replica starts from.
    pub const ROOT: NodeId = NodeId {
        site: SiteId::ROOT,
        counter: 0,
    };

    pub fn new(site: SiteId, counter: u64) -> NodeId {
        return NodeId { site, counter };
    }

    #[inline(always)]
    pub fn is_root(&self) -> bool {
        return *self == NodeId::ROOT;
    }
}

impl PartialOrd for NodeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl Ord for NodeId {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.counter.cmp(&other.counter) {
            Ordering::Equal => self.site.cmp(&other.site),
            other => other,
        }
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "NodeId(root)");
        }
        return write!(f, "NodeId({:x}, {})", self.site.0, self.counter);
    }
}
