//! Microdata vocabulary
//!
//! Attribute names, token splitting, type URL handling and item identity.

use livemd_dom::{DomTree, NodeId};

pub const ITEMSCOPE: &str = "itemscope";
pub const ITEMTYPE: &str = "itemtype";
pub const ITEMPROP: &str = "itemprop";
pub const ITEMID: &str = "itemid";
pub const ITEMREF: &str = "itemref";
pub const ID: &str = "id";

/// Whitespace-separated tokens of an attribute value
pub fn tokens(value: &str) -> impl Iterator<Item = &str> {
    value.split_ascii_whitespace()
}

/// Whether the element starts an item scope
pub fn is_scope(tree: &DomTree, element: NodeId) -> bool {
    tree.has_attr(element, ITEMSCOPE)
}

/// Property names declared by the element's `itemprop`
pub fn property_names(tree: &DomTree, element: NodeId) -> impl Iterator<Item = &str> {
    tree.attr(element, ITEMPROP).into_iter().flat_map(tokens)
}

/// Whether the element declares `name` among its property names
pub fn declares(tree: &DomTree, element: NodeId, name: &str) -> bool {
    property_names(tree, element).any(|n| n == name)
}

/// Type URLs from `itemtype`
pub fn item_types(tree: &DomTree, element: NodeId) -> Vec<&str> {
    tree.attr(element, ITEMTYPE).map(|v| tokens(v).collect()).unwrap_or_default()
}

/// Whether `itemtype` lists `type_url`
pub fn has_type(tree: &DomTree, element: NodeId, type_url: &str) -> bool {
    item_types(tree, element).contains(&type_url)
}

/// Attributes whose change can move elements between items or re-key them
pub fn is_structural_attribute(name: &str) -> bool {
    matches!(name, ITEMSCOPE | ITEMTYPE | ITEMID | ITEMREF | ID)
}

/// Split a type URL into `(@context, @type)`: the last segment is the type,
/// everything before it (separator included) the context.
pub fn split_type(type_url: &str) -> (Option<&str>, &str) {
    let trimmed = type_url.trim_end_matches('/');
    match trimmed.rfind(['/', '#']) {
        Some(pos) => (Some(&type_url[..=pos]), &trimmed[pos + 1..]),
        None => (None, trimmed),
    }
}

/// How an item is identified.
///
/// A plain `id` makes the item authoritative even when `itemid` is also
/// present; `itemid` alone makes it a reference to an item held elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Carries an `id` attribute: the source of truth for rendered views
    Authoritative(String),
    /// Carries only an `itemid`
    Referential(String),
    /// Neither; addressable by position only
    Anonymous,
}

impl Identity {
    pub fn of(tree: &DomTree, element: NodeId) -> Self {
        let non_empty = |name| tree.attr(element, name).map(str::trim).filter(|v| !v.is_empty());
        if let Some(id) = non_empty(ID) {
            Self::Authoritative(id.to_string())
        } else if let Some(itemid) = non_empty(ITEMID) {
            Self::Referential(itemid.to_string())
        } else {
            Self::Anonymous
        }
    }

    /// Collection key for identified items
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Authoritative(key) | Self::Referential(key) => Some(key),
            Self::Anonymous => None,
        }
    }

    pub fn is_authoritative(&self) -> bool {
        matches!(self, Self::Authoritative(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_type() {
        assert_eq!(
            split_type("https://schema.org/Person"),
            (Some("https://schema.org/"), "Person")
        );
        assert_eq!(
            split_type("http://example.org/vocab#Event"),
            (Some("http://example.org/vocab#"), "Event")
        );
        assert_eq!(split_type("Thing"), (None, "Thing"));
    }

    #[test]
    fn test_identity_precedence() {
        let mut tree = DomTree::new();
        let el = tree.create_element("div");
        assert_eq!(Identity::of(&tree, el), Identity::Anonymous);

        tree.set_attr(el, ITEMID, "urn:isbn:1").unwrap();
        assert_eq!(Identity::of(&tree, el), Identity::Referential("urn:isbn:1".into()));

        tree.set_attr(el, ID, "book").unwrap();
        assert_eq!(Identity::of(&tree, el), Identity::Authoritative("book".into()));
        assert_eq!(Identity::of(&tree, el).key(), Some("book"));
    }

    #[test]
    fn test_declares_token() {
        let mut tree = DomTree::new();
        let el = tree.create_element("span");
        tree.set_attr(el, ITEMPROP, " name  alternateName ").unwrap();
        assert!(declares(&tree, el, "name"));
        assert!(declares(&tree, el, "alternateName"));
        assert!(!declares(&tree, el, "nam"));
    }
}
