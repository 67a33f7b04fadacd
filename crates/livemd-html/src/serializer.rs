//! HTML Serialization (innerHTML/outerHTML)
//!
//! Serializes DOM nodes back to HTML strings. Template contents are written
//! inside their `<template>` element, as browsers do.

use livemd_dom::{DomTree, NodeData, NodeId};

/// HTML serializer
#[derive(Debug, Clone)]
pub struct HtmlSerializer {
    /// Whether to format output with indentation
    pub pretty_print: bool,
    /// Indentation string
    pub indent: String,
}

/// Void elements (no end tag)
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "param", "source", "track", "wbr",
];

/// Raw text elements (no escaping for content)
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

impl Default for HtmlSerializer {
    fn default() -> Self {
        Self {
            pretty_print: false,
            indent: "  ".to_string(),
        }
    }
}

impl HtmlSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self {
            pretty_print: true,
            ..Self::default()
        }
    }

    /// Serialize innerHTML of a node (children only)
    pub fn serialize_inner(&self, tree: &DomTree, node_id: NodeId) -> String {
        let mut output = String::new();
        self.serialize_children(tree, node_id, &mut output, 0);
        output
    }

    /// Serialize outerHTML of a node (including the node itself)
    pub fn serialize_outer(&self, tree: &DomTree, node_id: NodeId) -> String {
        let mut output = String::new();
        self.serialize_node(tree, node_id, &mut output, 0);
        output
    }

    fn serialize_node(&self, tree: &DomTree, node_id: NodeId, output: &mut String, depth: usize) {
        let Some(node) = tree.get(node_id) else {
            return;
        };

        match &node.data {
            NodeData::Document | NodeData::Fragment => {
                self.serialize_children(tree, node_id, output, depth);
            }
            NodeData::Element(elem) => {
                let tag = tree.resolve(elem.name);
                let is_void = VOID_ELEMENTS.contains(&tag);
                let is_raw = RAW_TEXT_ELEMENTS.contains(&tag);

                if self.pretty_print && depth > 0 {
                    self.newline(output, depth);
                }

                output.push('<');
                output.push_str(tag);
                for attr in &elem.attrs {
                    output.push(' ');
                    output.push_str(tree.resolve(attr.name));
                    if !attr.value.is_empty() {
                        output.push_str("=\"");
                        escape_attribute(&attr.value, output);
                        output.push('"');
                    }
                }

                if is_void {
                    output.push_str(" />");
                    return;
                }
                output.push('>');

                if let Some(content) = elem.template_content {
                    self.serialize_children(tree, content, output, depth + 1);
                }
                if is_raw {
                    self.serialize_children_raw(tree, node_id, output);
                } else {
                    self.serialize_children(tree, node_id, output, depth + 1);
                }

                if self.pretty_print && tree.children(node_id).any(|(_, c)| c.is_element()) {
                    self.newline(output, depth);
                }
                output.push_str("</");
                output.push_str(tag);
                output.push('>');
            }
            NodeData::Text(text) => {
                // Pretty output supplies its own layout whitespace
                if self.pretty_print && text.content.trim().is_empty() {
                    return;
                }
                escape_text(&text.content, output);
            }
            NodeData::Comment(text) => {
                output.push_str("<!--");
                output.push_str(text);
                output.push_str("-->");
            }
            NodeData::Doctype { name, .. } => {
                output.push_str("<!DOCTYPE ");
                output.push_str(tree.resolve(*name));
                output.push('>');
            }
        }
    }

    fn newline(&self, output: &mut String, depth: usize) {
        output.push('\n');
        for _ in 0..depth {
            output.push_str(&self.indent);
        }
    }

    fn serialize_children(
        &self,
        tree: &DomTree,
        parent_id: NodeId,
        output: &mut String,
        depth: usize,
    ) {
        for (child_id, _) in tree.children(parent_id) {
            self.serialize_node(tree, child_id, output, depth);
        }
    }

    fn serialize_children_raw(&self, tree: &DomTree, parent_id: NodeId, output: &mut String) {
        for (_, child) in tree.children(parent_id) {
            if let Some(text) = child.as_text() {
                output.push_str(text);
            }
        }
    }
}

/// Escape text content for HTML
fn escape_text(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            _ => output.push(c),
        }
    }
}

/// Escape attribute value
fn escape_attribute(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '"' => output.push_str("&quot;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            _ => output.push(c),
        }
    }
}

/// Utility: Get innerHTML of an element
pub fn get_inner_html(tree: &DomTree, node_id: NodeId) -> String {
    HtmlSerializer::new().serialize_inner(tree, node_id)
}

/// Utility: Get outerHTML of an element
pub fn get_outer_html(tree: &DomTree, node_id: NodeId) -> String {
    HtmlSerializer::new().serialize_outer(tree, node_id)
}
