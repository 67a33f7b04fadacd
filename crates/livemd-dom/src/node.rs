//! DOM Node - Compact representation
//!
//! Uses NodeId (4 bytes) links instead of pointers; the tree owns every node
//! in a single arena and detached nodes simply lose their parent link.

use crate::{InternedString, NodeId};

/// DOM Node - Core structure
#[derive(Debug, Clone)]
pub struct Node {
    /// Parent node (NONE if root or detached)
    pub parent: NodeId,
    /// First child
    pub first_child: NodeId,
    /// Last child (for O(1) append)
    pub last_child: NodeId,
    /// Previous sibling
    pub prev_sibling: NodeId,
    /// Next sibling
    pub next_sibling: NodeId,
    /// Node-specific data
    pub data: NodeData,
}

impl Node {
    fn with_data(data: NodeData) -> Self {
        Self {
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
            data,
        }
    }

    /// Create a new element node
    pub fn element(name: InternedString) -> Self {
        Self::with_data(NodeData::Element(ElementData::new(name)))
    }

    /// Create a new text node
    pub fn text(content: String) -> Self {
        Self::with_data(NodeData::Text(TextData { content }))
    }

    /// Create a comment node
    pub fn comment(content: String) -> Self {
        Self::with_data(NodeData::Comment(content))
    }

    /// Create a document node
    pub fn document() -> Self {
        Self::with_data(NodeData::Document)
    }

    /// Create a document fragment node
    pub fn fragment() -> Self {
        Self::with_data(NodeData::Fragment)
    }

    /// Create a doctype node
    pub fn doctype(name: InternedString, public_id: String, system_id: String) -> Self {
        Self::with_data(NodeData::Doctype { name, public_id, system_id })
    }

    /// Detached copy of this node's data, without any links
    pub(crate) fn unlinked_copy(&self) -> Self {
        Self::with_data(self.data.clone())
    }

    /// Check if this is an element
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Check if this is text
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    /// Whether this node may hold children
    #[inline]
    pub fn is_container(&self) -> bool {
        matches!(self.data, NodeData::Document | NodeData::Fragment | NodeData::Element(_))
    }

    /// Get element data if this is an element
    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get mutable element data
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get text content if this is a text node
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(&t.content),
            _ => None,
        }
    }
}

/// Node-specific data
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root
    Document,
    /// Document fragment (template contents, clone targets)
    Fragment,
    /// DOCTYPE
    Doctype {
        name: InternedString,
        public_id: String,
        system_id: String,
    },
    /// Element
    Element(ElementData),
    /// Text content
    Text(TextData),
    /// Comment
    Comment(String),
}

/// Element-specific data
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Tag name (lowercase local name)
    pub name: InternedString,
    /// Attributes in source order
    pub attrs: Vec<Attribute>,
    /// Inert content fragment of a `<template>` element
    pub template_content: Option<NodeId>,
}

impl ElementData {
    pub fn new(name: InternedString) -> Self {
        Self {
            name,
            attrs: Vec::new(),
            template_content: None,
        }
    }

    /// Get an attribute value
    pub fn get_attr(&self, name: InternedString) -> Option<&str> {
        self.attrs.iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, returning the previous value
    pub fn set_attr(&mut self, name: InternedString, value: String) -> Option<String> {
        for attr in self.attrs.iter_mut() {
            if attr.name == name {
                return Some(std::mem::replace(&mut attr.value, value));
            }
        }
        self.attrs.push(Attribute { name, value });
        None
    }

    /// Remove an attribute, returning its value
    pub fn remove_attr(&mut self, name: InternedString) -> Option<String> {
        let pos = self.attrs.iter().position(|a| a.name == name)?;
        Some(self.attrs.remove(pos).value)
    }
}

/// Text node data
#[derive(Debug, Clone)]
pub struct TextData {
    pub content: String,
}

/// Attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: InternedString,
    pub value: String,
}
