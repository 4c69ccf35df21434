//! Document configuration.

use crate::crdt::id::SiteId;
use crate::error::Error;
use crate::error::Result;

/// Default minimum degree of the linear order's B+ tree.
/// Leaves hold up to `2 * degree - 1` elements, branches up to `2 * degree` children.
pub const DEFAULT_DEGREE: usize = 32;

/// Smallest degree that still yields a valid B+ tree.
pub const MIN_DEGREE: usize = 2;

/// Construction parameters for a [`Document`](crate::crdt::document::Document).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Minimum degree `t` of the order-statistics tree.
    pub degree: usize,
    /// Fixed site identity. `None` draws a fresh random one.
    pub site: Option<SiteId>,
}

impl Config {
    pub fn new() -> Config {
        return Config {
            degree: DEFAULT_DEGREE,
            site: None,
        };
    }

    /// Set the B+ tree degree.
    pub fn degree(mut self, degree: usize) -> Config {
        self.degree = degree;
        return self;
    }

    /// Pin the site identity, mostly useful for reproducible tests.
    pub fn site(mut self, site: SiteId) -> Config {
        self.site = Some(site);
        return self;
    }

    /// Check that the configuration can build a document.
    pub fn validate(&self) -> Result<()> {
        if self.degree < MIN_DEGREE {
            return Err(Error::InvalidDegree(self.degree));
        }
        return Ok(());
    }
}

impl Default for Config {
    fn default() -> Self {
        return Self::new();
    }
}
