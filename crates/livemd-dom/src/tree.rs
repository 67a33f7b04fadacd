//! DOM Tree (arena-based allocation)
//!
//! Every structural and attribute mutation goes through [`DomTree`] so it can
//! be reported to the attached [`MutationObserver`].

use std::cmp::Ordering;

use crate::{
    DomError, DomResult, ElementData, InternedString, MutationObserver, MutationObserverInit,
    MutationOrigin, MutationRecord, Node, NodeData, NodeId, StringInterner,
};

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    interner: StringInterner,
    observer: MutationObserver,
    internal_writes: u32,
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
            free: Vec::new(),
            interner: StringInterner::new(),
            observer: MutationObserver::new(),
            internal_writes: 0,
        }
    }

    /// Document node
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound(id))
    }

    /// Number of arena slots (attached, detached or released)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    pub fn interner_mut(&mut self) -> &mut StringInterner {
        &mut self.interner
    }

    /// Resolve an interned name
    pub fn resolve(&self, name: InternedString) -> &str {
        self.interner.get(name)
    }

    fn push(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id.index()] = node;
            return id;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    // ------------------------------------------------------------------
    // Node creation (detached)
    // ------------------------------------------------------------------

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let name = self.interner.intern(&tag.to_ascii_lowercase());
        self.push(Node::element(name))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(Node::text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(Node::comment(text.to_string()))
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.push(Node::fragment())
    }

    pub fn create_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> NodeId {
        let name = self.interner.intern(name);
        self.push(Node::doctype(name, public_id.to_string(), system_id.to_string()))
    }

    /// Attach an inert content fragment to a `<template>` element
    pub fn set_template_content(&mut self, template: NodeId, fragment: NodeId) -> DomResult<()> {
        if !matches!(self.node(fragment)?.data, NodeData::Fragment) {
            return Err(DomError::InvalidNodeType(fragment));
        }
        let elem = self.element_mut(template)?;
        elem.template_content = Some(fragment);
        Ok(())
    }

    /// Content fragment of a `<template>` element
    pub fn template_content(&self, template: NodeId) -> Option<NodeId> {
        self.element(template)?.template_content
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent.to_option()
    }

    /// Direct children in order
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.get(id).map_or(NodeId::NONE, |n| n.first_child),
        }
    }

    /// Direct element children in order
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .filter(|(_, node)| node.is_element())
            .map(|(child, _)| child)
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.element_children(id).next()
    }

    /// Ancestors from the parent upwards (excluding `id`)
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.get(id).map_or(NodeId::NONE, |n| n.parent),
        }
    }

    /// Pre-order descendants (excluding `id`). Template contents are not children
    /// and are never visited.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            root: id,
            next: self.get(id).map_or(NodeId::NONE, |n| n.first_child),
        }
    }

    /// Inclusive containment: `node` is `ancestor` or below it
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether the node is attached below the document node
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.get(id).is_some() && self.contains(NodeId::ROOT, id)
    }

    /// Compare two nodes in tree order
    pub fn compare_document_order(&self, a: NodeId, b: NodeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let path_a = self.path(a);
        let path_b = self.path(b);
        let common = path_a.iter().zip(&path_b).take_while(|(x, y)| x == y).count();

        if common == 0 {
            // Different trees: fall back to creation order
            return a.cmp(&b);
        }
        if common == path_a.len() {
            return Ordering::Less;
        }
        if common == path_b.len() {
            return Ordering::Greater;
        }

        let (branch_a, branch_b) = (path_a[common], path_b[common]);
        let mut cursor = self.get(branch_a).map_or(NodeId::NONE, |n| n.next_sibling);
        while let Some(node) = self.get(cursor) {
            if cursor == branch_b {
                return Ordering::Less;
            }
            cursor = node.next_sibling;
        }
        Ordering::Greater
    }

    fn path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path: Vec<NodeId> = self.ancestors(id).collect();
        path.reverse();
        path.push(id);
        path
    }

    /// First connected element with the given `id` attribute, in document order
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        let key = self.interner.lookup("id")?;
        self.descendants(NodeId::ROOT)
            .find(|&node| self.element(node).and_then(|e| e.get_attr(key)) == Some(id))
    }

    // ------------------------------------------------------------------
    // Elements and attributes
    // ------------------------------------------------------------------

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_element)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id)?.as_element()
    }

    fn element_mut(&mut self, id: NodeId) -> DomResult<&mut ElementData> {
        self.nodes
            .get_mut(id.index())
            .ok_or(DomError::NotFound(id))?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType(id))
    }

    /// Lowercase tag name
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        let elem = self.element(id)?;
        Some(self.interner.get(elem.name))
    }

    pub fn has_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag_name(id) == Some(tag)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        let key = self.interner.lookup(name)?;
        self.element(id)?.get_attr(key)
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// All attributes as (name, value) pairs in source order
    pub fn attributes(&self, id: NodeId) -> Vec<(&str, &str)> {
        self.element(id)
            .map(|elem| {
                elem.attrs.iter()
                    .map(|a| (self.interner.get(a.name), a.value.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let key = self.interner.intern(name);
        let old = self.element_mut(id)?.set_attr(key, value.to_string());
        self.queue(MutationRecord::attribute(id, name, old));
        Ok(())
    }

    /// Remove an attribute; no record is queued when it was absent
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> DomResult<Option<String>> {
        let Some(key) = self.interner.lookup(name) else {
            return Ok(None);
        };
        let old = self.element_mut(id)?.remove_attr(key);
        if old.is_some() {
            self.queue(MutationRecord::attribute(id, name, old.clone()));
        }
        Ok(old)
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Text(text)) => text.content.clone(),
            Some(NodeData::Comment(text)) => text.clone(),
            Some(_) => self.descendants(id)
                .filter_map(|n| self.get(n).and_then(Node::as_text))
                .collect(),
            None => String::new(),
        }
    }

    /// Replace all children with a single text node.
    ///
    /// Queues exactly one record: character data when the element already holds
    /// a single text child, otherwise one child list change.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> DomResult<()> {
        let node = self.node(id)?;
        if node.is_text() {
            return self.set_text_data(id, text);
        }
        if !node.is_container() {
            return Err(DomError::InvalidNodeType(id));
        }

        let children: Vec<NodeId> = self.children(id).map(|(child, _)| child).collect();
        if let [only] = children[..] {
            if self.get(only).is_some_and(Node::is_text) {
                return self.set_text_data(only, text);
            }
        }

        for &child in &children {
            self.unlink(child);
        }
        let added = if text.is_empty() {
            Vec::new()
        } else {
            let node = self.create_text(text);
            self.link_before(id, node, NodeId::NONE);
            vec![node]
        };
        if !children.is_empty() || !added.is_empty() {
            self.queue(MutationRecord::child_list(id, added, children));
        }
        Ok(())
    }

    /// Replace the data of a text node
    pub fn set_text_data(&mut self, id: NodeId, data: &str) -> DomResult<()> {
        let node = self.nodes.get_mut(id.index()).ok_or(DomError::NotFound(id))?;
        let NodeData::Text(text) = &mut node.data else {
            return Err(DomError::InvalidNodeType(id));
        };
        let old = std::mem::replace(&mut text.content, data.to_string());
        self.queue(MutationRecord::character_data(id, old));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or append). A fragment inserts its
    /// children instead of itself. A child attached elsewhere is moved.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<NodeId> {
        if !self.node(parent)?.is_container() {
            return Err(DomError::InvalidNodeType(parent));
        }
        let child_node = self.node(child)?;
        if matches!(child_node.data, NodeData::Document) || self.contains(child, parent) {
            return Err(DomError::HierarchyRequest);
        }
        let mut reference = reference;
        if reference == Some(child) {
            reference = child_node.next_sibling.to_option();
        }
        if let Some(r) = reference {
            if self.parent(r) != Some(parent) {
                return Err(DomError::NotAChild { parent, child: r });
            }
        }

        if matches!(child_node.data, NodeData::Fragment) {
            let kids: Vec<NodeId> = self.children(child).map(|(kid, _)| kid).collect();
            for &kid in &kids {
                self.unlink(kid);
                self.link_before(parent, kid, reference.unwrap_or(NodeId::NONE));
            }
            if !kids.is_empty() {
                self.queue(MutationRecord::child_list(parent, kids, Vec::new()));
            }
            return Ok(child);
        }

        if let Some(old_parent) = self.parent(child) {
            self.remove_child(old_parent, child)?;
        }
        self.link_before(parent, child, reference.unwrap_or(NodeId::NONE));

        let node = self.node(child)?;
        let record = MutationRecord::child_list(parent, vec![child], Vec::new())
            .with_siblings(node.prev_sibling.to_option(), node.next_sibling.to_option());
        self.queue(record);
        Ok(child)
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        let node = self.node(child)?;
        let (prev, next) = (node.prev_sibling.to_option(), node.next_sibling.to_option());
        self.unlink(child);
        let record =
            MutationRecord::child_list(parent, Vec::new(), vec![child]).with_siblings(prev, next);
        self.queue(record);
        Ok(child)
    }

    /// Detach a node from its parent, if any
    pub fn remove(&mut self, node: NodeId) -> DomResult<()> {
        if let Some(parent) = self.parent(node) {
            self.remove_child(parent, node)?;
        }
        Ok(())
    }

    /// Put `new_child` where `old_child` is and detach `old_child`
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> DomResult<NodeId> {
        if self.parent(old_child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child: old_child });
        }
        if new_child == old_child {
            return Ok(old_child);
        }
        self.insert_before(parent, new_child, Some(old_child))?;
        self.remove_child(parent, old_child)
    }

    /// Copy a node (and with `deep`, its subtree). The copy is detached.
    pub fn clone_node(&mut self, node: NodeId, deep: bool) -> DomResult<NodeId> {
        let copy = self.node(node)?.unlinked_copy();
        let id = self.push(copy);

        if let Some(content) = self.template_content(node) {
            let cloned = if deep {
                self.clone_node(content, true)?
            } else {
                self.create_fragment()
            };
            self.element_mut(id)?.template_content = Some(cloned);
        }

        if deep {
            let kids: Vec<NodeId> = self.children(node).map(|(kid, _)| kid).collect();
            for kid in kids {
                let cloned = self.clone_node(kid, true)?;
                self.link_before(id, cloned, NodeId::NONE);
            }
        }
        Ok(id)
    }

    /// Give a detached subtree's slots back to the arena. Ids from the
    /// subtree are dead afterwards and may be handed out again.
    pub fn release(&mut self, node: NodeId) -> DomResult<usize> {
        if node == NodeId::ROOT || self.free.contains(&node) {
            return Err(DomError::NotFound(node));
        }
        if self.node(node)?.parent.is_valid() {
            return Err(DomError::HierarchyRequest);
        }

        let mut stack = vec![node];
        let mut released = 0;
        while let Some(id) = stack.pop() {
            stack.extend(self.children(id).map(|(kid, _)| kid));
            stack.extend(self.template_content(id));
            if let Some(slot) = self.nodes.get_mut(id.index()) {
                *slot = Node::fragment();
                self.free.push(id);
                released += 1;
            }
        }
        tracing::trace!("released {} nodes from {}", released, node);
        Ok(released)
    }

    // Unlink without recording
    fn unlink(&mut self, child: NodeId) {
        let Some(node) = self.get(child) else { return };
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);

        if let Some(p) = self.get_mut(prev) {
            p.next_sibling = next;
        } else if let Some(p) = self.get_mut(parent) {
            p.first_child = next;
        }
        if let Some(n) = self.get_mut(next) {
            n.prev_sibling = prev;
        } else if let Some(p) = self.get_mut(parent) {
            p.last_child = prev;
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    // Link a detached node before `reference` (NONE appends), without recording
    fn link_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        let prev = match self.get(reference) {
            Some(r) => r.prev_sibling,
            None => self.get(parent).map_or(NodeId::NONE, |p| p.last_child),
        };

        if let Some(node) = self.get_mut(child) {
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = reference;
        }
        if let Some(p) = self.get_mut(prev) {
            p.next_sibling = child;
        } else if let Some(p) = self.get_mut(parent) {
            p.first_child = child;
        }
        if let Some(r) = self.get_mut(reference) {
            r.prev_sibling = child;
        } else if let Some(p) = self.get_mut(parent) {
            p.last_child = child;
        }
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Start queueing mutation records for `target`
    pub fn observe(&mut self, target: NodeId, options: MutationObserverInit) {
        self.observer.observe(target, options);
    }

    /// Stop observing and drop queued records
    pub fn disconnect(&mut self) {
        self.observer.disconnect();
    }

    /// Drain the queued batch
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        self.observer.take_records()
    }

    /// Records queued since the last batch
    pub fn pending_records(&self) -> &[MutationRecord] {
        self.observer.records()
    }

    /// Run `f` with the internal-write flag set. Records queued meanwhile are
    /// tagged [`MutationOrigin::Internal`].
    pub fn with_internal_writes<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.internal_writes += 1;
        let result = f(self);
        self.internal_writes -= 1;
        result
    }

    pub fn is_writing_internally(&self) -> bool {
        self.internal_writes > 0
    }

    fn queue(&mut self, mut record: MutationRecord) {
        if !self.observer.is_observing() || !self.observer.options().accepts(&record) {
            return;
        }
        let subtree = self.observer.options().subtree;
        let watched = self.observer.observed().iter()
            .any(|&t| t == record.target || (subtree && self.contains(t, record.target)));
        if !watched {
            return;
        }
        if self.internal_writes > 0 {
            record.origin = MutationOrigin::Internal;
        }
        tracing::trace!("queued {:?} on {}", record.mutation_type, record.target);
        self.observer.push_record(record);
    }

    /// Memory usage in bytes (approximate)
    pub fn memory_usage(&self) -> usize {
        self.nodes.capacity() * std::mem::size_of::<Node>() + self.interner.memory_usage()
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over direct children
pub struct Children<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl<'a> Iterator for Children<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next;
        let node = self.tree.get(id)?;
        self.next = node.next_sibling;
        Some((id, node))
    }
}

/// Iterator over ancestors
pub struct Ancestors<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next;
        let node = self.tree.get(id)?;
        self.next = node.parent;
        Some(id)
    }
}

/// Pre-order iterator over a subtree
pub struct Descendants<'a> {
    tree: &'a DomTree,
    root: NodeId,
    next: NodeId,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next;
        let node = self.tree.get(current)?;

        let mut successor = node.first_child;
        let mut cursor = current;
        while !successor.is_valid() && cursor != self.root {
            let Some(n) = self.tree.get(cursor) else { break };
            if n.next_sibling.is_valid() {
                successor = n.next_sibling;
            } else {
                cursor = n.parent;
                if !cursor.is_valid() {
                    break;
                }
            }
        }
        self.next = successor;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MutationType;

    fn list(tree: &mut DomTree, items: usize) -> (NodeId, Vec<NodeId>) {
        let ul = tree.create_element("ul");
        tree.append_child(NodeId::ROOT, ul).unwrap();
        let lis = (0..items)
            .map(|_| {
                let li = tree.create_element("li");
                tree.append_child(ul, li).unwrap();
                li
            })
            .collect();
        (ul, lis)
    }

    #[test]
    fn test_append_and_children() {
        let mut tree = DomTree::new();
        let (ul, lis) = list(&mut tree, 3);
        let children: Vec<NodeId> = tree.children(ul).map(|(id, _)| id).collect();
        assert_eq!(children, lis);
        assert_eq!(tree.parent(lis[0]), Some(ul));
    }

    #[test]
    fn test_insert_before_and_remove() {
        let mut tree = DomTree::new();
        let (ul, lis) = list(&mut tree, 2);
        let extra = tree.create_element("li");
        tree.insert_before(ul, extra, Some(lis[1])).unwrap();
        let order: Vec<NodeId> = tree.element_children(ul).collect();
        assert_eq!(order, vec![lis[0], extra, lis[1]]);

        tree.remove(extra).unwrap();
        assert!(!tree.is_connected(extra));
        assert_eq!(tree.element_children(ul).count(), 2);
    }

    #[test]
    fn test_hierarchy_error() {
        let mut tree = DomTree::new();
        let (ul, lis) = list(&mut tree, 1);
        assert_eq!(tree.append_child(lis[0], ul), Err(DomError::HierarchyRequest));
    }

    #[test]
    fn test_descendants_preorder_stays_in_subtree() {
        let mut tree = DomTree::new();
        let (ul, lis) = list(&mut tree, 2);
        let text = tree.create_text("x");
        tree.append_child(lis[0], text).unwrap();
        let sibling = tree.create_element("p");
        tree.append_child(NodeId::ROOT, sibling).unwrap();

        let visited: Vec<NodeId> = tree.descendants(ul).collect();
        assert_eq!(visited, vec![lis[0], text, lis[1]]);
    }

    #[test]
    fn test_document_order() {
        let mut tree = DomTree::new();
        let (ul, lis) = list(&mut tree, 2);
        assert_eq!(tree.compare_document_order(lis[0], lis[1]), Ordering::Less);
        assert_eq!(tree.compare_document_order(lis[1], lis[0]), Ordering::Greater);
        assert_eq!(tree.compare_document_order(ul, lis[1]), Ordering::Less);
    }

    #[test]
    fn test_text_write_queues_one_record() {
        let mut tree = DomTree::new();
        let (_, lis) = list(&mut tree, 1);
        tree.set_text_content(lis[0], "first").unwrap();
        tree.observe(NodeId::ROOT, MutationObserverInit::all());

        tree.set_text_content(lis[0], "second").unwrap();
        let records = tree.take_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].mutation_type, MutationType::CharacterData);
        assert_eq!(records[0].old_value.as_deref(), Some("first"));
        assert_eq!(tree.text_content(lis[0]), "second");
    }

    #[test]
    fn test_internal_writes_are_tagged() {
        let mut tree = DomTree::new();
        let (_, lis) = list(&mut tree, 1);
        tree.observe(NodeId::ROOT, MutationObserverInit::all());

        tree.with_internal_writes(|tree| tree.set_attr(lis[0], "itemprop", "name")).unwrap();
        tree.set_attr(lis[0], "class", "x").unwrap();

        let records = tree.take_records();
        assert_eq!(records[0].origin, MutationOrigin::Internal);
        assert_eq!(records[1].origin, MutationOrigin::External);
        assert!(!tree.is_writing_internally());
    }

    #[test]
    fn test_detached_changes_not_recorded() {
        let mut tree = DomTree::new();
        tree.observe(NodeId::ROOT, MutationObserverInit::all());
        let div = tree.create_element("div");
        tree.set_attr(div, "id", "x").unwrap();
        assert!(tree.pending_records().is_empty());
    }

    #[test]
    fn test_clone_is_detached_and_deep() {
        let mut tree = DomTree::new();
        let (ul, _) = list(&mut tree, 2);
        let copy = tree.clone_node(ul, true).unwrap();
        assert!(!tree.is_connected(copy));
        assert_eq!(tree.element_children(copy).count(), 2);
        assert_eq!(tree.clone_node(ul, false).map(|c| tree.children(c).count()), Ok(0));
    }
}
