//! Strand - A replicated text document built on a tree CRDT.
//!
//! Replicas exchange per-character operations in any order, with gaps and
//! repeats, and converge on the same text. Carets are held as anchors bound
//! to neighboring characters, so they survive concurrent edits elsewhere.
//!
//! # Quick Start
//!
//! ```
//! use strand::Crdt;
//! use strand::Document;
//! use strand::Gravity;
//!
//! let mut alice = Document::new();
//! let mut bob = Document::new();
//!
//! // Alice types, Bob receives her operations
//! for op in alice.insert_text(0, "Hello!").unwrap() {
//!     bob.apply(op).unwrap();
//! }
//!
//! // Bob anchors a caret before the '!'
//! let caret = bob.create_anchor(5, Gravity::Right);
//!
//! // Alice edits in front of it
//! alice.insert_text(5, ", World").unwrap();
//! bob.merge(&alice).unwrap();
//!
//! assert_eq!(bob.render(), "Hello, World!");
//! assert_eq!(bob.resolve_anchor(&caret), 12);
//! ```

pub mod config;
pub mod crdt;
pub mod error;

pub use config::Config;
pub use crdt::Crdt;
pub use crdt::anchor::Anchor;
pub use crdt::anchor::Gravity;
pub use crdt::anchor::Range;
pub use crdt::document::ChangeEvent;
pub use crdt::document::ChangeKind;
pub use crdt::document::Document;
pub use crdt::id::NodeId;
pub use crdt::id::SiteId;
pub use crdt::op::Op;
pub use crdt::op::OpRecord;
pub use crdt::order_list::OrderList;
pub use error::Error;
pub use error::Result;
