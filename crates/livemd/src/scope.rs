//! Scope walking
//!
//! Enumerates the property elements that belong to an item scope: a pre-order
//! walk of the root's subtree that never enters a nested scope, followed by
//! the elements reachable through the root's `itemref` ids.

use livemd_dom::{DomTree, NodeId};

use crate::vocab::{self, ITEMREF};

/// Walks the property elements of item scopes
#[derive(Debug, Clone, Copy)]
pub struct ScopeWalker<'a> {
    tree: &'a DomTree,
    follow_refs: bool,
}

impl<'a> ScopeWalker<'a> {
    /// Walker that includes `itemref` targets
    pub fn new(tree: &'a DomTree) -> Self {
        Self { tree, follow_refs: true }
    }

    /// Walker restricted to the root's own subtree
    pub fn own_scope(tree: &'a DomTree) -> Self {
        Self { tree, follow_refs: false }
    }

    /// All property elements of the scope: own subtree first, then `itemref`
    /// targets, each in document order. No element is reported twice.
    pub fn property_elements(&self, root: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect_below(root, &mut found);

        if self.follow_refs {
            for target in self.referenced_elements(root) {
                if self.declares_any(target) {
                    found.push(target);
                }
                if !vocab::is_scope(self.tree, target) {
                    self.collect_below(target, &mut found);
                }
            }
        }

        let mut seen = Vec::with_capacity(found.len());
        found.retain(|&el| {
            let first = !seen.contains(&el);
            seen.push(el);
            first
        });
        found
    }

    /// Property elements declaring `name`, in encounter order
    pub fn property_elements_for(&self, root: NodeId, name: &str) -> Vec<NodeId> {
        self.property_elements(root)
            .into_iter()
            .filter(|&el| vocab::declares(self.tree, el, name))
            .collect()
    }

    /// Property names in order of first occurrence
    pub fn all_property_names(&self, root: NodeId) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for el in self.property_elements(root) {
            for name in vocab::property_names(self.tree, el) {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }

    /// Elements named by the root's `itemref`. Each id is resolved once;
    /// ids that match no element are skipped.
    pub fn referenced_elements(&self, root: NodeId) -> Vec<NodeId> {
        let Some(refs) = self.tree.attr(root, ITEMREF) else {
            return Vec::new();
        };

        let mut visited: Vec<&str> = Vec::new();
        let mut targets = Vec::new();
        for id in vocab::tokens(refs) {
            if visited.contains(&id) {
                continue;
            }
            visited.push(id);
            match self.tree.get_element_by_id(id) {
                Some(target) if target != root => targets.push(target),
                Some(_) => {}
                None => tracing::trace!("itemref `{}` on {} matches no element", id, root),
            }
        }
        targets
    }

    fn declares_any(&self, el: NodeId) -> bool {
        vocab::property_names(self.tree, el).next().is_some()
    }

    // Pre-order over element descendants of `parent`, not entering nested scopes
    fn collect_below(&self, parent: NodeId, out: &mut Vec<NodeId>) {
        let mut stack: Vec<NodeId> = self.tree.element_children(parent).collect();
        stack.reverse();

        while let Some(el) = stack.pop() {
            if self.declares_any(el) {
                out.push(el);
            }
            if !vocab::is_scope(self.tree, el) {
                let start = stack.len();
                stack.extend(self.tree.element_children(el));
                stack[start..].reverse();
            }
        }
    }
}

/// Nearest scope element at or above `node`
pub fn owning_scope(tree: &DomTree, node: NodeId) -> Option<NodeId> {
    std::iter::once(node)
        .chain(tree.ancestors(node))
        .find(|&n| vocab::is_scope(tree, n))
}

/// Outermost scope element at or above `node`
pub fn outermost_scope(tree: &DomTree, node: NodeId) -> Option<NodeId> {
    std::iter::once(node)
        .chain(tree.ancestors(node))
        .filter(|&n| vocab::is_scope(tree, n))
        .last()
}

/// Scope elements in `root`'s subtree, `root` included, in document order
pub fn scopes_within(tree: &DomTree, root: NodeId) -> Vec<NodeId> {
    std::iter::once(root)
        .chain(tree.descendants(root))
        .filter(|&n| vocab::is_scope(tree, n))
        .collect()
}

/// `itemref` ids used by `root` or by any scope nested inside it
pub fn referenced_ids(tree: &DomTree, root: NodeId) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for scope in scopes_within(tree, root) {
        for id in tree.attr(scope, ITEMREF).into_iter().flat_map(vocab::tokens) {
            if !ids.iter().any(|known| known == id) {
                ids.push(id.to_string());
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::{ID, ITEMPROP, ITEMSCOPE};

    struct Fixture {
        tree: DomTree,
    }

    impl Fixture {
        fn new() -> Self {
            Self { tree: DomTree::new() }
        }

        fn el(&mut self, parent: NodeId, attrs: &[(&str, &str)]) -> NodeId {
            let el = self.tree.create_element("div");
            for (name, value) in attrs {
                self.tree.set_attr(el, name, value).unwrap();
            }
            self.tree.append_child(parent, el).unwrap();
            el
        }
    }

    #[test]
    fn test_nested_scope_excluded() {
        let mut f = Fixture::new();
        let root = f.el(NodeId::ROOT, &[(ITEMSCOPE, "")]);
        let name = f.el(root, &[(ITEMPROP, "name")]);
        let author = f.el(root, &[(ITEMPROP, "author"), (ITEMSCOPE, "")]);
        f.el(author, &[(ITEMPROP, "name")]);
        let wrapper = f.el(root, &[]);
        let year = f.el(wrapper, &[(ITEMPROP, "year")]);

        let walker = ScopeWalker::new(&f.tree);
        assert_eq!(walker.property_elements(root), vec![name, author, year]);
        assert_eq!(walker.all_property_names(root), vec!["name", "author", "year"]);
        assert_eq!(walker.property_elements_for(root, "name"), vec![name]);
        assert_eq!(walker.all_property_names(author), vec!["name"]);
    }

    #[test]
    fn test_itemref_union_without_duplicates() {
        let mut f = Fixture::new();
        let root = f.el(NodeId::ROOT, &[(ITEMSCOPE, ""), (ITEMREF, "a b a missing")]);
        let own = f.el(root, &[(ITEMPROP, "q")]);
        let a = f.el(NodeId::ROOT, &[(ID, "a"), (ITEMPROP, "q")]);
        let b = f.el(NodeId::ROOT, &[(ID, "b")]);
        let inside_b = f.el(b, &[(ITEMPROP, "q")]);

        let walker = ScopeWalker::new(&f.tree);
        assert_eq!(walker.property_elements_for(root, "q"), vec![own, a, inside_b]);
        assert!(ScopeWalker::own_scope(&f.tree).property_elements_for(root, "q") == vec![own]);
    }

    #[test]
    fn test_itemref_into_own_subtree_not_double_counted() {
        let mut f = Fixture::new();
        let root = f.el(NodeId::ROOT, &[(ITEMSCOPE, ""), (ITEMREF, "inner")]);
        let inner = f.el(root, &[(ID, "inner"), (ITEMPROP, "q")]);

        let walker = ScopeWalker::new(&f.tree);
        assert_eq!(walker.property_elements_for(root, "q"), vec![inner]);
    }

    #[test]
    fn test_scope_helpers() {
        let mut f = Fixture::new();
        let outer = f.el(NodeId::ROOT, &[(ITEMSCOPE, ""), (ITEMREF, "x")]);
        let inner = f.el(outer, &[(ITEMSCOPE, ""), (ITEMPROP, "part"), (ITEMREF, "y x")]);
        let leaf = f.el(inner, &[(ITEMPROP, "name")]);

        assert_eq!(owning_scope(&f.tree, leaf), Some(inner));
        assert_eq!(outermost_scope(&f.tree, leaf), Some(outer));
        assert_eq!(scopes_within(&f.tree, outer), vec![outer, inner]);
        assert_eq!(referenced_ids(&f.tree, outer), vec!["x", "y"]);
    }
}
