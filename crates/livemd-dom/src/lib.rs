//! livemd DOM - Document Object Model
//!
//! Arena-allocated DOM tree with an observable mutation queue.
//!
//! Mutations performed through [`DomTree`] are queued as [`MutationRecord`]s
//! while an observer is attached. A batch is delivered when the host calls
//! [`DomTree::take_records`], which stands in for the observer callback that a
//! browser schedules on the next microtask.

mod document;
mod interner;
mod node;
mod observer;
mod operations;
mod tree;

pub use document::Document;
pub use interner::{InternedString, StringInterner};
pub use node::{Attribute, ElementData, Node, NodeData, TextData};
pub use observer::{
    MutationObserver, MutationObserverInit, MutationOrigin, MutationRecord, MutationType,
};
pub use operations::{DomError, DomResult};
pub use tree::{Ancestors, Children, Descendants, DomTree};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root (document) node ID
    pub const ROOT: NodeId = NodeId(0);
    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check whether this ID refers to a node
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Convert a sentinel-encoded link into an `Option`
    #[inline]
    pub fn to_option(self) -> Option<NodeId> {
        self.is_valid().then_some(self)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "#{}", self.0)
        } else {
            f.write_str("#none")
        }
    }
}
