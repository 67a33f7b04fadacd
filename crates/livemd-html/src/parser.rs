//! HTML5 Parser implementation
//!
//! Uses html5ever's RcDom and converts it to our arena DOM. Template contents
//! become inert fragments attached to their `<template>` element.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use livemd_dom::{Document, DomResult, DomTree, NodeId};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use crate::ParseError;

/// HTML5 parser
#[derive(Debug, Clone, Copy)]
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    /// Parse HTML string into a Document
    pub fn parse(&self, html: &str) -> Result<Document, ParseError> {
        self.parse_with_url(html, "about:blank")
    }

    /// Parse HTML with a document URL
    pub fn parse_with_url(&self, html: &str, url: &str) -> Result<Document, ParseError> {
        tracing::debug!("Parsing HTML document: {}", url);

        let dom = parse_document(RcDom::default(), Default::default()).one(html);

        let mut document = Document::empty(url);
        self.convert_node(&dom.document, document.tree_mut(), NodeId::ROOT)?;
        document.finalize();

        tracing::debug!("Parsed {} nodes", document.tree().len());
        Ok(document)
    }

    /// Convert an RcDom node to our DOM format
    fn convert_node(&self, handle: &Handle, tree: &mut DomTree, parent: NodeId) -> DomResult<()> {
        match &handle.data {
            RcNodeData::Document => {
                self.convert_children(handle, tree, parent)?;
            }
            RcNodeData::Doctype { name, public_id, system_id } => {
                let id = tree.create_doctype(name, public_id, system_id);
                tree.append_child(parent, id)?;
            }
            RcNodeData::Text { contents } => {
                let id = tree.create_text(&contents.borrow());
                tree.append_child(parent, id)?;
            }
            RcNodeData::Comment { contents } => {
                let id = tree.create_comment(contents);
                tree.append_child(parent, id)?;
            }
            RcNodeData::Element { name, attrs, template_contents, .. } => {
                let id = tree.create_element(&name.local);
                for attr in attrs.borrow().iter() {
                    tree.set_attr(id, &attr.name.local, &attr.value)?;
                }
                tree.append_child(parent, id)?;

                if let Some(contents) = template_contents.borrow().as_ref() {
                    let fragment = tree.create_fragment();
                    self.convert_children(contents, tree, fragment)?;
                    tree.set_template_content(id, fragment)?;
                }

                self.convert_children(handle, tree, id)?;
            }
            RcNodeData::ProcessingInstruction { .. } => {
                // Not meaningful in HTML documents
            }
        }
        Ok(())
    }

    fn convert_children(
        &self,
        handle: &Handle,
        tree: &mut DomTree,
        parent: NodeId,
    ) -> DomResult<()> {
        for child in handle.children.borrow().iter() {
            self.convert_node(child, tree, parent)?;
        }
        Ok(())
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}
