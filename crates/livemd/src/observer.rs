//! Change observation
//!
//! Turns a batch of mutation records into change events:
//!
//! ```text
//! records -> ChangePlan (classify) -> collection/snapshot updates -> ChangeEvent
//! ```
//!
//! Attribute changes that can re-key items or move elements between scopes
//! trigger a full reindex. Otherwise removals are applied before additions,
//! and content changes re-read only the items they touch.

use livemd_dom::{
    DomTree, MutationObserverInit, MutationOrigin, MutationRecord, MutationType, NodeId,
};
use serde_json::Value as Json;

use crate::collection::Collection;
use crate::item::Item;
use crate::scope;
use crate::vocab;

/// Outcome of processing one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A top-level item appeared
    ItemAdded(Item),
    /// A top-level item left the document (or became nested)
    ItemRemoved(Item),
    /// Property values of a tracked item changed
    PropertyChanged {
        item: Item,
        names: Vec<String>,
        origin: MutationOrigin,
    },
    /// The collection was rebuilt
    Rescanned,
}

impl ChangeEvent {
    pub fn item(&self) -> Option<Item> {
        match self {
            Self::ItemAdded(item) | Self::ItemRemoved(item) => Some(*item),
            Self::PropertyChanged { item, .. } => Some(*item),
            Self::Rescanned => None,
        }
    }

    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::PropertyChanged { .. })
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::PropertyChanged { origin: MutationOrigin::Internal, .. })
    }
}

/// Classified batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangePlan {
    /// Rebuild the whole collection
    pub rescan: bool,
    /// Roots of removed subtrees
    pub removed: Vec<NodeId>,
    /// Roots of inserted subtrees
    pub added: Vec<NodeId>,
    /// Nodes whose value-bearing content changed
    pub content: Vec<(NodeId, MutationOrigin)>,
    /// `External` if any record in the batch was
    pub origin: MutationOrigin,
}

impl ChangePlan {
    /// Classify records in delivery order
    pub fn classify(records: &[MutationRecord], structural_extra: &[String]) -> Self {
        let mut plan = Self {
            rescan: false,
            removed: Vec::new(),
            added: Vec::new(),
            content: Vec::new(),
            origin: merged_origin(records),
        };

        for record in records {
            match record.mutation_type {
                MutationType::Attributes => {
                    let name = record.attribute_name.as_deref().unwrap_or_default();
                    let structural = vocab::is_structural_attribute(name)
                        || structural_extra.iter().any(|a| a == name);
                    if structural {
                        plan.rescan = true;
                    } else {
                        plan.content.push((record.target, record.origin));
                    }
                }
                MutationType::CharacterData => plan.content.push((record.target, record.origin)),
                MutationType::ChildList => {
                    plan.removed.extend(&record.removed_nodes);
                    plan.added.extend(&record.added_nodes);
                    plan.content.push((record.target, record.origin));
                }
            }
        }
        plan
    }
}

fn merged_origin(records: &[MutationRecord]) -> MutationOrigin {
    if records.iter().any(|r| r.origin == MutationOrigin::External) {
        MutationOrigin::External
    } else {
        MutationOrigin::Internal
    }
}

/// Keeps a [`Collection`] in step with the document
#[derive(Debug, Default, Clone)]
pub struct ChangeObserver {
    structural_extra: Vec<String>,
    batches: usize,
}

impl ChangeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also treat `attribute` as structural (e.g. the view container marker)
    pub fn with_structural_attribute(mut self, attribute: &str) -> Self {
        self.structural_extra.push(attribute.to_string());
        self
    }

    /// Subscribe the document to everything the observer needs
    pub fn attach(&self, tree: &mut DomTree) {
        tree.observe(NodeId::ROOT, MutationObserverInit::all());
    }

    /// Batches processed so far
    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Apply one batch to `collection` and report what changed
    pub fn process(
        &mut self,
        tree: &DomTree,
        collection: &mut Collection,
        records: &[MutationRecord],
    ) -> Vec<ChangeEvent> {
        if records.is_empty() {
            return Vec::new();
        }
        self.batches += 1;
        let plan = ChangePlan::classify(records, &self.structural_extra);
        let mut events = Vec::new();

        if plan.rescan {
            let report = collection.reindex(tree);
            tracing::debug!(
                "rescan: {} added, {} removed",
                report.added.len(),
                report.removed.len()
            );
            events.extend(report.removed.iter().copied().map(ChangeEvent::ItemRemoved));
            events.extend(report.added.iter().copied().map(ChangeEvent::ItemAdded));
            events.push(ChangeEvent::Rescanned);

            let kept: Vec<Item> = collection.iter().filter(|i| !report.added.contains(i)).collect();
            for item in kept {
                refresh(tree, collection, item, plan.origin, &mut events);
            }
            return events;
        }

        if !plan.removed.is_empty() {
            let gone: Vec<Item> = collection
                .iter()
                .filter(|item| {
                    let root = item.root();
                    plan.removed.iter().any(|&r| tree.contains(r, root))
                        && !collection.is_top_level(tree, root)
                })
                .collect();
            for item in gone {
                collection.remove(tree, item);
                tracing::debug!("item {} removed", item.root());
                events.push(ChangeEvent::ItemRemoved(item));
            }
        }

        let mut added = Vec::new();
        for &node in &plan.added {
            if !tree.is_connected(node) {
                continue;
            }
            for root in scope::scopes_within(tree, node) {
                let item = Item::from_scope(root);
                if collection.add_if_top_level(tree, item) {
                    tracing::debug!("item {} added", root);
                    added.push(item);
                    events.push(ChangeEvent::ItemAdded(item));
                }
            }
        }

        let refs = ReferenceIndex::build(tree, collection);
        let mut dirty: Vec<(Item, MutationOrigin)> = Vec::new();
        let mut mark = |item: Item, origin: MutationOrigin| {
            if added.contains(&item) {
                return;
            }
            match dirty.iter_mut().find(|(known, _)| *known == item) {
                Some(entry) if origin == MutationOrigin::External => entry.1 = origin,
                Some(_) => {}
                None => dirty.push((item, origin)),
            }
        };

        // Subtrees carrying itemref targets can move without touching any
        // property element of the items that reference them
        for &node in plan.removed.iter().chain(&plan.added) {
            for id in subtree_ids(tree, node) {
                for item in refs.referencing(id) {
                    mark(item, plan.origin);
                }
            }
        }
        for &(target, origin) in &plan.content {
            for item in owners(tree, collection, &refs, target) {
                mark(item, origin);
            }
        }
        for (item, origin) in dirty {
            refresh(tree, collection, item, origin, &mut events);
        }

        events
    }
}

// `itemref` ids of every tracked item, computed once per batch
struct ReferenceIndex {
    entries: Vec<(Item, Vec<String>)>,
}

impl ReferenceIndex {
    fn build(tree: &DomTree, collection: &Collection) -> Self {
        let entries = collection
            .iter()
            .map(|item| (item, scope::referenced_ids(tree, item.root())))
            .filter(|(_, ids)| !ids.is_empty())
            .collect();
        Self { entries }
    }

    fn referencing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = Item> + 'a {
        self.entries
            .iter()
            .filter(move |(_, ids)| ids.iter().any(|r| r == id))
            .map(|(item, _)| *item)
    }
}

// `id`s in a subtree, its root included. Detached subtrees keep theirs.
fn subtree_ids(tree: &DomTree, node: NodeId) -> Vec<&str> {
    std::iter::once(node)
        .chain(tree.descendants(node))
        .filter_map(|n| tree.attr(n, vocab::ID))
        .collect()
}

// Tracked items whose values may depend on `target`: the item whose scope
// tree holds it, and items that pull it in through `itemref`
fn owners(
    tree: &DomTree,
    collection: &Collection,
    refs: &ReferenceIndex,
    target: NodeId,
) -> Vec<Item> {
    let element = if tree.is_element(target) { Some(target) } else { tree.parent(target) };
    let Some(element) = element.filter(|&el| tree.is_connected(el)) else {
        return Vec::new();
    };

    let mut owners = Vec::new();
    if let Some(top) = scope::outermost_scope(tree, element) {
        let item = Item::from_scope(top);
        if collection.contains(item) {
            owners.push(item);
        }
    }

    for id in std::iter::once(element)
        .chain(tree.ancestors(element))
        .filter_map(|n| tree.attr(n, vocab::ID))
    {
        for item in refs.referencing(id) {
            if !owners.contains(&item) {
                owners.push(item);
            }
        }
    }
    owners
}

fn refresh(
    tree: &DomTree,
    collection: &mut Collection,
    item: Item,
    origin: MutationOrigin,
    events: &mut Vec<ChangeEvent>,
) {
    let Some(tracked) = collection.tracked_mut(item) else {
        return;
    };
    let snapshot = item.to_structured(tree, None);
    if snapshot == tracked.snapshot {
        return;
    }

    let names = changed_names(&tracked.snapshot, &snapshot);
    tracked.snapshot = snapshot;
    tracing::trace!("item {} changed {:?} ({:?})", item.root(), names, origin);
    events.push(ChangeEvent::PropertyChanged { item, names, origin });
}

fn changed_names(old: &Json, new: &Json) -> Vec<String> {
    let (Some(old), Some(new)) = (old.as_object(), new.as_object()) else {
        return Vec::new();
    };
    let mut names: Vec<String> = new
        .iter()
        .filter(|(name, value)| !name.starts_with('@') && old.get(*name) != Some(*value))
        .map(|(name, _)| name.clone())
        .collect();
    names.extend(
        old.keys()
            .filter(|name| !name.starts_with('@') && !new.contains_key(*name))
            .cloned(),
    );
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use livemd_dom::Document;

    struct Harness {
        doc: Document,
        collection: Collection,
        observer: ChangeObserver,
    }

    impl Harness {
        fn new(body: &str) -> Self {
            let mut doc = livemd_html::parse(&format!("<html><body>{body}</body></html>")).unwrap();
            let mut collection = Collection::new();
            collection.scan(&doc.tree);
            let observer = ChangeObserver::new();
            observer.attach(&mut doc.tree);
            Self { doc, collection, observer }
        }

        fn el(&self, id: &str) -> NodeId {
            self.doc.get_element_by_id(id).unwrap()
        }

        fn flush(&mut self) -> Vec<ChangeEvent> {
            let records = self.doc.tree.take_records();
            self.observer.process(&self.doc.tree, &mut self.collection, &records)
        }
    }

    #[test]
    fn test_text_edit_is_targeted_update() {
        let mut h =
            Harness::new(r#"<div id="p" itemscope><span id="n" itemprop="name">Alice</span></div>"#);
        let n = h.el("n");
        h.doc.tree.set_text_content(n, "Alicia").unwrap();

        let events = h.flush();
        let item = h.collection.get("p").unwrap();
        assert_eq!(
            events,
            vec![ChangeEvent::PropertyChanged {
                item,
                names: vec!["name".into()],
                origin: MutationOrigin::External,
            }]
        );
        assert!(h.flush().is_empty());
    }

    #[test]
    fn test_internal_write_tagged() {
        let mut h =
            Harness::new(r#"<div id="p" itemscope><span itemprop="name">Alice</span></div>"#);
        let item = h.collection.get("p").unwrap();
        item.set(&mut h.doc.tree, "name", "X").unwrap();
        assert_eq!(h.doc.tree.pending_records().len(), 1);

        let events = h.flush();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_internal());
    }

    #[test]
    fn test_removal_and_addition() {
        let mut h = Harness::new(r#"<div id="a" itemscope></div><div id="host"></div>"#);
        let a = h.el("a");
        let item = h.collection.get("a").unwrap();
        h.doc.tree.remove(a).unwrap();
        assert_eq!(h.flush(), vec![ChangeEvent::ItemRemoved(item)]);
        assert!(h.collection.is_empty());

        let host = h.el("host");
        let fresh = h.doc.tree.create_element("div");
        h.doc.tree.set_attr(fresh, "itemscope", "").unwrap();
        h.doc.tree.append_child(host, fresh).unwrap();
        let events = h.flush();
        assert_eq!(events, vec![ChangeEvent::ItemAdded(Item::from_scope(fresh))]);
        assert_eq!(h.collection.get(0usize), Some(Item::from_scope(fresh)));
    }

    #[test]
    fn test_move_is_not_removal() {
        let mut h = Harness::new(r#"<div id="a" itemscope></div><div id="host"></div>"#);
        let (a, host) = (h.el("a"), h.el("host"));
        h.doc.tree.append_child(host, a).unwrap();

        let events = h.flush();
        assert!(events.iter().all(|e| !matches!(e, ChangeEvent::ItemRemoved(_))));
        assert_eq!(h.collection.len(), 1);
    }

    #[test]
    fn test_identity_attribute_triggers_rescan() {
        let mut h = Harness::new(r#"<div id="a" itemscope></div>"#);
        let a = h.el("a");
        h.doc.tree.set_attr(a, "id", "b").unwrap();

        let events = h.flush();
        assert!(events.contains(&ChangeEvent::Rescanned));
        assert!(h.collection.get("b").is_some());
        assert!(h.collection.get("a").is_none());
    }

    #[test]
    fn test_itemref_target_edit_reaches_item() {
        let mut h = Harness::new(
            r#"<div id="p" itemscope itemref="extra"></div><p id="extra"><span id="q" itemprop="q">1</span></p>"#,
        );
        let q = h.el("q");
        h.doc.tree.set_text_content(q, "2").unwrap();

        let events = h.flush();
        let item = h.collection.get("p").unwrap();
        assert!(matches!(
            &events[..],
            [ChangeEvent::PropertyChanged { item: i, names, .. }] if *i == item && names == &["q"]
        ));
    }

    #[test]
    fn test_classify_orders_and_merges() {
        let records = vec![
            MutationRecord::attribute(NodeId::ROOT, "class", None),
            MutationRecord::child_list(NodeId::ROOT, vec![], vec![NodeId::ROOT]),
        ];
        let plan = ChangePlan::classify(&records, &[]);
        assert!(!plan.rescan);
        assert_eq!(plan.removed, vec![NodeId::ROOT]);
        assert_eq!(plan.content.len(), 2);
        assert_eq!(plan.origin, MutationOrigin::External);

        let records = vec![MutationRecord::attribute(NodeId::ROOT, "data-itemtype", None)];
        assert!(ChangePlan::classify(&records, &["data-itemtype".to_string()]).rescan);
    }
}
