//! Property value access
//!
//! Reads and writes the value of a single property element. The channel is
//! chosen per element kind, first match wins:
//!
//! 1. a `content` attribute
//! 2. the raw `href` of a link element (relative references are preserved)
//! 3. the `src` of an embedded media element
//! 4. the `datetime` of a `<time>` element
//! 5. the text content, trimmed on read and replaced verbatim on write
//!
//! Nested item scopes are not values; callers resolve them to items first.

use livemd_dom::{DomResult, DomTree, NodeId};

const HREF_ELEMENTS: &[&str] = &["a", "area", "link"];
const SRC_ELEMENTS: &[&str] = &["audio", "embed", "iframe", "img", "source", "track", "video"];

/// Where an element keeps its property value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueChannel {
    Content,
    Href,
    Src,
    DateTime,
    Text,
}

impl ValueChannel {
    /// Attribute holding the value, if the channel is attribute-based
    pub fn attribute(self) -> Option<&'static str> {
        match self {
            Self::Content => Some("content"),
            Self::Href => Some("href"),
            Self::Src => Some("src"),
            Self::DateTime => Some("datetime"),
            Self::Text => None,
        }
    }
}

/// Reads and writes property element values
pub struct PropertyAccessor;

impl PropertyAccessor {
    /// Pick the value channel for an element
    pub fn channel(tree: &DomTree, element: NodeId) -> ValueChannel {
        let tag = tree.tag_name(element).unwrap_or_default();
        if tree.has_attr(element, "content") {
            ValueChannel::Content
        } else if HREF_ELEMENTS.contains(&tag) && tree.has_attr(element, "href") {
            ValueChannel::Href
        } else if SRC_ELEMENTS.contains(&tag) {
            ValueChannel::Src
        } else if tag == "time" && tree.has_attr(element, "datetime") {
            ValueChannel::DateTime
        } else {
            ValueChannel::Text
        }
    }

    /// Current value of a property element
    pub fn read(tree: &DomTree, element: NodeId) -> String {
        match Self::channel(tree, element).attribute() {
            Some(attr) => tree.attr(element, attr).unwrap_or_default().to_string(),
            None => tree.text_content(element).trim().to_string(),
        }
    }

    /// Write a value; the DOM changes synchronously
    pub fn write(tree: &mut DomTree, element: NodeId, value: &str) -> DomResult<()> {
        match Self::channel(tree, element).attribute() {
            Some(attr) => tree.set_attr(element, attr, value),
            None => tree.set_text_content(element, value),
        }
    }
}
