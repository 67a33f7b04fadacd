//! Document - High-level document API

use crate::{DomTree, NodeId};

/// HTML Document
#[derive(Debug)]
pub struct Document {
    /// The DOM tree
    pub tree: DomTree,
    /// Document URL
    url: String,
    /// Cached reference to <html> element
    html_element: NodeId,
    /// Cached reference to <head> element
    head_element: NodeId,
    /// Cached reference to <body> element
    body_element: NodeId,
}

impl Document {
    /// Create a new document with an html/head/body skeleton
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();

        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        // Freshly created nodes under the document node cannot violate hierarchy rules
        let _ = tree.append_child(tree.root(), html);
        let _ = tree.append_child(html, head);
        let _ = tree.append_child(html, body);

        Self {
            tree,
            url: url.to_string(),
            html_element: html,
            head_element: head,
            body_element: body,
        }
    }

    /// Create an empty document (no structure)
    pub fn empty(url: &str) -> Self {
        Self {
            tree: DomTree::new(),
            url: url.to_string(),
            html_element: NodeId::NONE,
            head_element: NodeId::NONE,
            body_element: NodeId::NONE,
        }
    }

    /// Locate html/head/body after the tree was populated externally
    pub fn finalize(&mut self) {
        let tree = &self.tree;
        self.html_element = tree.element_children(tree.root())
            .find(|&id| tree.has_tag(id, "html"))
            .unwrap_or(NodeId::NONE);
        self.head_element = tree.element_children(self.html_element)
            .find(|&id| tree.has_tag(id, "head"))
            .unwrap_or(NodeId::NONE);
        self.body_element = tree.element_children(self.html_element)
            .find(|&id| tree.has_tag(id, "body"))
            .unwrap_or(NodeId::NONE);
    }

    /// Get document URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw `href` of the first `<base>` element in `<head>`
    pub fn base_href(&self) -> Option<&str> {
        let tree = &self.tree;
        tree.element_children(self.head_element)
            .find(|&id| tree.has_tag(id, "base") && tree.has_attr(id, "href"))
            .and_then(|id| tree.attr(id, "href"))
    }

    /// Get document title
    pub fn title(&self) -> String {
        let tree = &self.tree;
        tree.element_children(self.head_element)
            .find(|&id| tree.has_tag(id, "title"))
            .map(|id| tree.text_content(id).trim().to_string())
            .unwrap_or_default()
    }

    /// Get <html> element
    pub fn document_element(&self) -> NodeId {
        self.html_element
    }

    /// Get <head> element
    pub fn head(&self) -> NodeId {
        self.head_element
    }

    /// Get <body> element
    pub fn body(&self) -> NodeId {
        self.body_element
    }

    /// Get element by ID
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.tree.get_element_by_id(id)
    }

    /// Access the DOM tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Access the DOM tree mutably
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    /// Memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        self.tree.memory_usage() + self.url.capacity()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}
