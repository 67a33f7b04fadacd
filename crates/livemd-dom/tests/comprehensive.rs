//! Comprehensive tests for livemd-dom
//!
//! Document structure, attribute handling and mutation batching.

use livemd_dom::{Document, DomTree, MutationObserverInit, MutationOrigin, MutationType, NodeId};

#[test]
fn test_document_skeleton() {
    let doc = Document::new("https://example.com/");
    assert!(doc.document_element().is_valid());
    assert!(doc.head().is_valid());
    assert!(doc.body().is_valid());
    assert_eq!(doc.url(), "https://example.com/");
    assert_eq!(doc.tree().tag_name(doc.body()), Some("body"));
}

#[test]
fn test_get_element_by_id_ignores_detached() {
    let mut doc = Document::default();
    let body = doc.body();
    let tree = doc.tree_mut();

    let a = tree.create_element("div");
    tree.set_attr(a, "id", "target").unwrap();
    let b = tree.create_element("div");
    tree.set_attr(b, "id", "target").unwrap();
    tree.append_child(body, b).unwrap();

    assert_eq!(doc.get_element_by_id("target"), Some(b));
    assert_eq!(doc.get_element_by_id("missing"), None);
}

#[test]
fn test_title_and_base() {
    let mut doc = Document::new("https://example.com/a/b.html");
    let head = doc.head();
    let tree = doc.tree_mut();

    let title = tree.create_element("title");
    let text = tree.create_text("  People  ");
    tree.append_child(title, text).unwrap();
    tree.append_child(head, title).unwrap();

    let base = tree.create_element("base");
    tree.set_attr(base, "href", "/root/").unwrap();
    tree.append_child(head, base).unwrap();

    assert_eq!(doc.title(), "People");
    assert_eq!(doc.base_href(), Some("/root/"));
}

#[test]
fn test_attribute_round_trip() {
    let mut tree = DomTree::new();
    let div = tree.create_element("DIV");
    assert_eq!(tree.tag_name(div), Some("div"));

    tree.set_attr(div, "itemprop", "name title").unwrap();
    assert_eq!(tree.attr(div, "itemprop"), Some("name title"));
    assert_eq!(tree.attributes(div), vec![("itemprop", "name title")]);

    assert_eq!(tree.remove_attr(div, "itemprop").unwrap(), Some("name title".to_string()));
    assert!(!tree.has_attr(div, "itemprop"));
}

#[test]
fn test_mutation_batch_contents() {
    let mut doc = Document::default();
    let body = doc.body();
    let tree = doc.tree_mut();
    tree.observe(NodeId::ROOT, MutationObserverInit::all());

    let div = tree.create_element("div");
    tree.append_child(body, div).unwrap();
    tree.set_attr(div, "itemscope", "").unwrap();
    tree.set_text_content(div, "hello").unwrap();
    tree.remove(div).unwrap();

    let records = tree.take_records();
    let kinds: Vec<MutationType> = records.iter().map(|r| r.mutation_type).collect();
    assert_eq!(kinds, vec![
        MutationType::ChildList,
        MutationType::Attributes,
        MutationType::ChildList,
        MutationType::ChildList,
    ]);
    assert_eq!(records[0].added_nodes, vec![div]);
    assert_eq!(records[1].attribute_name.as_deref(), Some("itemscope"));
    assert_eq!(records[3].removed_nodes, vec![div]);
    assert!(records.iter().all(|r| r.origin == MutationOrigin::External));
    assert!(tree.take_records().is_empty());
}

#[test]
fn test_attribute_filter_limits_records() {
    let mut doc = Document::default();
    let body = doc.body();
    let tree = doc.tree_mut();
    tree.observe(NodeId::ROOT, MutationObserverInit {
        attributes: true,
        subtree: true,
        attribute_filter: Some(vec!["itemid".to_string()]),
        ..Default::default()
    });

    tree.set_attr(body, "class", "x").unwrap();
    tree.set_attr(body, "itemid", "urn:x").unwrap();

    let records = tree.take_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].attribute_name.as_deref(), Some("itemid"));
}

#[test]
fn test_moving_node_records_removal_then_addition() {
    let mut doc = Document::default();
    let body = doc.body();
    let tree = doc.tree_mut();
    let a = tree.create_element("section");
    let b = tree.create_element("section");
    let item = tree.create_element("div");
    tree.append_child(body, a).unwrap();
    tree.append_child(body, b).unwrap();
    tree.append_child(a, item).unwrap();

    tree.observe(NodeId::ROOT, MutationObserverInit::all());
    tree.append_child(b, item).unwrap();

    let records = tree.take_records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].removed_nodes, vec![item]);
    assert_eq!(records[1].added_nodes, vec![item]);
    assert!(tree.is_connected(item));
}
