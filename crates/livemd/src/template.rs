//! Template rendering
//!
//! A template's first element is cloned and filled from a JSON-LD shaped
//! record. Property elements are bound by `itemprop`; a value array repeats
//! the element once per entry and a nested object fills a nested scope.
//!
//! A name written `name[]` forces the repeated form even for a single
//! value. The suffix belongs to the template only and is removed from the
//! rendered output.

use livemd_dom::{DomError, DomTree, NodeId};
use serde_json::{Map, Value as Json};

use crate::accessor::PropertyAccessor;
use crate::item::scalar_text;
use crate::scope::ScopeWalker;
use crate::vocab::{self, ITEMPROP};
use crate::{Error, Result};

const FORCE_SEQUENCE: &str = "[]";

/// Renders a record into a detached view element
pub trait TemplateRenderer {
    fn render(&self, tree: &mut DomTree, template: NodeId, data: &Json) -> Result<NodeId>;
}

/// Default renderer binding values through the microdata vocabulary
#[derive(Debug, Default, Clone, Copy)]
pub struct MicrodataTemplate;

impl TemplateRenderer for MicrodataTemplate {
    fn render(&self, tree: &mut DomTree, template: NodeId, data: &Json) -> Result<NodeId> {
        let content = tree.template_content(template).unwrap_or(template);
        let prototype = tree
            .first_element_child(content)
            .ok_or(Error::EmptyTemplate(template))?;

        let view = tree.clone_node(prototype, true)?;
        let mut dropped = Vec::new();
        if let Some(record) = data.as_object() {
            bind(tree, view, record, &mut dropped)?;
        }
        for el in dropped {
            tree.release(el)?;
        }
        strip_directives(tree, view)?;
        Ok(view)
    }
}

/// Property name without the force-sequence suffix, and whether it had one
pub fn parse_directive(token: &str) -> (&str, bool) {
    match token.strip_suffix(FORCE_SEQUENCE) {
        Some(name) => (name, true),
        None => (token, false),
    }
}

// Group the scope's own property elements by bare name, in first-occurrence order
fn bindings(tree: &DomTree, root: NodeId) -> Vec<(String, bool, Vec<NodeId>)> {
    let mut groups: Vec<(String, bool, Vec<NodeId>)> = Vec::new();
    for el in ScopeWalker::own_scope(tree).property_elements(root) {
        for token in vocab::property_names(tree, el) {
            let (name, forced) = parse_directive(token);
            match groups.iter_mut().find(|(n, _, _)| n == name) {
                Some((_, force, elements)) => {
                    *force |= forced;
                    elements.push(el);
                }
                None => groups.push((name.to_string(), forced, vec![el])),
            }
        }
    }
    groups
}

// Elements removed while binding are collected in `dropped`
fn bind(
    tree: &mut DomTree,
    root: NodeId,
    record: &Map<String, Json>,
    dropped: &mut Vec<NodeId>,
) -> Result<()> {
    for (name, forced, elements) in bindings(tree, root) {
        let Some(value) = record.get(&name) else {
            continue;
        };
        let values: Vec<&Json> = match value {
            Json::Array(values) => values.iter().collect(),
            Json::Null => Vec::new(),
            other => vec![other],
        };
        if !forced && values.len() == 1 && elements.len() == 1 {
            bind_value(tree, elements[0], values[0], dropped)?;
            continue;
        }
        repeat(tree, &elements, &values, dropped)?;
    }
    Ok(())
}

// Positional fill: reuse existing elements, clone the last one for surplus
// values and drop the rest
fn repeat(
    tree: &mut DomTree,
    elements: &[NodeId],
    values: &[&Json],
    dropped: &mut Vec<NodeId>,
) -> Result<()> {
    let Some(&last) = elements.last() else {
        return Ok(());
    };
    let mut anchor = last;
    for (i, value) in values.iter().enumerate() {
        let el = match elements.get(i) {
            Some(&el) => el,
            None => {
                let copy = tree.clone_node(last, true)?;
                let parent = tree.parent(anchor).ok_or(DomError::NotFound(anchor))?;
                let next = tree.get(anchor).and_then(|n| n.next_sibling.to_option());
                tree.insert_before(parent, copy, next)?;
                copy
            }
        };
        bind_value(tree, el, value, dropped)?;
        anchor = el;
    }
    for &el in elements.iter().skip(values.len()) {
        tree.remove(el)?;
        if !dropped.contains(&el) {
            dropped.push(el);
        }
    }
    Ok(())
}

fn bind_value(
    tree: &mut DomTree,
    element: NodeId,
    value: &Json,
    dropped: &mut Vec<NodeId>,
) -> Result<()> {
    match value {
        Json::Object(nested) if vocab::is_scope(tree, element) => {
            bind(tree, element, nested, dropped)
        }
        Json::Object(nested) => {
            // A record bound to a plain element shows its identity
            if let Some(id) = nested.get("@id").and_then(Json::as_str) {
                PropertyAccessor::write(tree, element, id)?;
            }
            Ok(())
        }
        scalar => {
            if let Some(text) = scalar_text(scalar) {
                PropertyAccessor::write(tree, element, &text)?;
            }
            Ok(())
        }
    }
}

fn strip_directives(tree: &mut DomTree, view: NodeId) -> Result<()> {
    let marked: Vec<NodeId> = std::iter::once(view)
        .chain(tree.descendants(view))
        .filter(|&n| tree.attr(n, ITEMPROP).is_some_and(|v| v.contains(FORCE_SEQUENCE)))
        .collect();
    for el in marked {
        let cleaned = vocab::property_names(tree, el)
            .map(|token| parse_directive(token).0)
            .collect::<Vec<_>>()
            .join(" ");
        tree.set_attr(el, ITEMPROP, &cleaned)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template(html: &str) -> (livemd_dom::Document, NodeId) {
        let doc = livemd_html::parse(&format!(
            "<html><body><template id=\"t\">{html}</template></body></html>"
        ))
        .unwrap();
        let t = doc.get_element_by_id("t").unwrap();
        (doc, t)
    }

    #[test]
    fn test_render_binds_values() {
        let (mut doc, t) = template(
            r#"<article itemscope><h2 itemprop="name"></h2><a itemprop="url" href=""></a></article>"#,
        );
        let view = MicrodataTemplate
            .render(&mut doc.tree, t, &json!({"name": "Alice", "url": "/alice"}))
            .unwrap();

        assert!(doc.tree.parent(view).is_none());
        let h2 = doc.tree.first_element_child(view).unwrap();
        assert_eq!(doc.tree.text_content(h2), "Alice");
        let a = doc.tree.element_children(view).nth(1).unwrap();
        assert_eq!(doc.tree.attr(a, "href"), Some("/alice"));
    }

    #[test]
    fn test_force_sequence_directive() {
        let (mut doc, t) =
            template(r#"<div itemscope><ul><li itemprop="skill[]"></li></ul></div>"#);
        let view = MicrodataTemplate
            .render(&mut doc.tree, t, &json!({"skill": ["HTML", "CSS"]}))
            .unwrap();

        let items: Vec<NodeId> = doc
            .tree
            .descendants(view)
            .filter(|&n| doc.tree.has_tag(n, "li"))
            .collect();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|&li| doc.tree.attr(li, "itemprop") == Some("skill")));
        assert_eq!(doc.tree.text_content(items[1]), "CSS");

        let single = MicrodataTemplate
            .render(&mut doc.tree, t, &json!({"skill": "Design"}))
            .unwrap();
        let li = doc.tree.descendants(single).find(|&n| doc.tree.has_tag(n, "li")).unwrap();
        assert_eq!(doc.tree.attr(li, "itemprop"), Some("skill"));
    }

    #[test]
    fn test_nested_scope_and_empty_sequence() {
        let (mut doc, t) = template(
            r#"<div itemscope><p itemprop="tag"></p><div itemprop="address" itemscope><span itemprop="city"></span></div></div>"#,
        );
        let view = MicrodataTemplate
            .render(&mut doc.tree, t, &json!({"tag": [], "address": {"city": "Oslo"}}))
            .unwrap();

        assert!(!doc.tree.descendants(view).any(|n| doc.tree.has_tag(n, "p")));
        assert_eq!(doc.tree.text_content(view), "Oslo");

        // The dropped paragraph's slot is free again
        let len = doc.tree.len();
        doc.tree.create_element("p");
        assert_eq!(doc.tree.len(), len);
    }

    #[test]
    fn test_empty_template() {
        let (mut doc, t) = template("just text");
        let err = MicrodataTemplate.render(&mut doc.tree, t, &json!({})).unwrap_err();
        assert!(matches!(err, Error::EmptyTemplate(n) if n == t));
    }

    #[test]
    fn test_parse_directive() {
        assert_eq!(parse_directive("name[]"), ("name", true));
        assert_eq!(parse_directive("name"), ("name", false));
    }
}
