//! Edge case and stress tests for livemd-dom

use livemd_dom::{DomError, DomTree, NodeId, StringInterner};

// ============================================================================
// STRING INTERNER EDGE CASES
// ============================================================================

#[test]
fn test_interner_empty_string() {
    let mut interner = StringInterner::new();
    let id = interner.intern("");
    assert_eq!(interner.get(id), "");
}

#[test]
fn test_interner_unicode_strings() {
    let mut interner = StringInterner::new();
    for s in ["hello", "世界", "🚀🌍🎉", "Ñoño", "null\0char"] {
        let id = interner.intern(s);
        assert_eq!(interner.get(id), s);
    }
}

// ============================================================================
// DOM TREE EDGE CASES
// ============================================================================

#[test]
fn test_tree_empty_operations() {
    let tree = DomTree::new();
    assert!(tree.get(NodeId::NONE).is_none());
    assert_eq!(tree.children(NodeId::NONE).count(), 0);
    assert_eq!(tree.descendants(NodeId::NONE).count(), 0);
    assert!(!tree.is_connected(NodeId::NONE));
}

#[test]
fn test_tree_deep_nesting() {
    let mut tree = DomTree::new();
    let mut parent = tree.root();
    for _ in 0..100 {
        let child = tree.create_element("div");
        tree.append_child(parent, child).unwrap();
        parent = child;
    }
    let text = tree.create_text("Deep content");
    tree.append_child(parent, text).unwrap();

    assert_eq!(tree.len(), 102); // root + 100 divs + text
    assert_eq!(tree.text_content(tree.root()), "Deep content");
    assert_eq!(tree.ancestors(text).count(), 101);
}

#[test]
fn test_tree_wide_tree() {
    let mut tree = DomTree::new();
    let parent = tree.create_element("ul");
    tree.append_child(tree.root(), parent).unwrap();
    for _ in 0..1000 {
        let li = tree.create_element("li");
        tree.append_child(parent, li).unwrap();
    }
    assert_eq!(tree.children(parent).count(), 1000);

    let node = tree.get(parent).unwrap();
    assert_ne!(node.first_child, node.last_child);
}

#[test]
fn test_tree_remove_all_children() {
    let mut tree = DomTree::new();
    let parent = tree.create_element("div");
    tree.append_child(tree.root(), parent).unwrap();
    let children: Vec<NodeId> = (0..5)
        .map(|_| {
            let child = tree.create_element("p");
            tree.append_child(parent, child).unwrap();
            child
        })
        .collect();

    for child in children {
        tree.remove(child).unwrap();
    }

    let node = tree.get(parent).unwrap();
    assert!(!node.first_child.is_valid());
    assert!(!node.last_child.is_valid());
}

#[test]
fn test_remove_child_wrong_parent() {
    let mut tree = DomTree::new();
    let a = tree.create_element("div");
    let b = tree.create_element("div");
    tree.append_child(tree.root(), a).unwrap();
    assert_eq!(
        tree.remove_child(a, b),
        Err(DomError::NotAChild { parent: a, child: b })
    );
}

#[test]
fn test_text_node_cannot_hold_children() {
    let mut tree = DomTree::new();
    let text = tree.create_text("x");
    let div = tree.create_element("div");
    assert_eq!(tree.append_child(text, div), Err(DomError::InvalidNodeType(text)));
}

#[test]
fn test_fragment_insertion_moves_children() {
    let mut tree = DomTree::new();
    let frag = tree.create_fragment();
    let a = tree.create_element("a");
    let b = tree.create_element("b");
    tree.append_child(frag, a).unwrap();
    tree.append_child(frag, b).unwrap();

    let div = tree.create_element("div");
    tree.append_child(tree.root(), div).unwrap();
    tree.append_child(div, frag).unwrap();

    assert_eq!(tree.element_children(div).collect::<Vec<_>>(), vec![a, b]);
    assert_eq!(tree.children(frag).count(), 0);
}

#[test]
fn test_replace_child_keeps_position() {
    let mut tree = DomTree::new();
    let ul = tree.create_element("ul");
    tree.append_child(tree.root(), ul).unwrap();
    let first = tree.create_element("li");
    let second = tree.create_element("li");
    tree.append_child(ul, first).unwrap();
    tree.append_child(ul, second).unwrap();

    let replacement = tree.create_element("li");
    tree.replace_child(ul, replacement, first).unwrap();

    assert_eq!(tree.element_children(ul).collect::<Vec<_>>(), vec![replacement, second]);
    assert!(!tree.is_connected(first));
}

#[test]
fn test_template_content_is_not_traversed() {
    let mut tree = DomTree::new();
    let template = tree.create_element("template");
    tree.append_child(tree.root(), template).unwrap();
    let content = tree.create_fragment();
    let inner = tree.create_element("span");
    tree.set_attr(inner, "id", "inert").unwrap();
    tree.append_child(content, inner).unwrap();
    tree.set_template_content(template, content).unwrap();

    assert_eq!(tree.template_content(template), Some(content));
    assert_eq!(tree.descendants(tree.root()).count(), 1);
    assert_eq!(tree.get_element_by_id("inert"), None);

    let copy = tree.clone_node(template, true).unwrap();
    let copied_content = tree.template_content(copy).unwrap();
    assert_ne!(copied_content, content);
    assert_eq!(tree.children(copied_content).count(), 1);
}

// ============================================================================
// SLOT REUSE
// ============================================================================

#[test]
fn test_released_subtree_slots_are_reused() {
    let mut tree = DomTree::new();
    let ul = tree.create_element("ul");
    tree.append_child(tree.root(), ul).unwrap();

    for round in 0..10 {
        let li = tree.create_element("li");
        let text = tree.create_text("x");
        tree.append_child(li, text).unwrap();
        tree.append_child(ul, li).unwrap();
        tree.remove(li).unwrap();
        assert_eq!(tree.release(li), Ok(2));
        if round > 0 {
            assert_eq!(tree.len(), 4);
        }
    }
    assert_eq!(tree.children(ul).count(), 0);
}

#[test]
fn test_release_refuses_attached_and_twice_released() {
    let mut tree = DomTree::new();
    let div = tree.create_element("div");
    tree.append_child(tree.root(), div).unwrap();

    assert_eq!(tree.release(div), Err(DomError::HierarchyRequest));
    assert_eq!(tree.release(NodeId::ROOT), Err(DomError::NotFound(NodeId::ROOT)));

    tree.remove(div).unwrap();
    assert_eq!(tree.release(div), Ok(1));
    assert_eq!(tree.release(div), Err(DomError::NotFound(div)));
}
