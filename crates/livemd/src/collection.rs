//! Item collection
//!
//! The top-level items of one document. Anonymous items are keyed by their
//! position among the other anonymous items; items with an `id` or `itemid`
//! are keyed by it and are not part of the positional index. When two items
//! share a key the first one in document order holds it; the other stays
//! enumerable and takes the key over if the holder goes away.

use std::collections::HashSet;
use std::fmt;

use livemd_dom::{DomTree, NodeId};
use serde_json::Value as Json;

use crate::item::Item;
use crate::vocab::{self, Identity};

/// Key of an item in a [`Collection`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemKey {
    Index(usize),
    Id(String),
}

impl From<usize> for ItemKey {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for ItemKey {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for ItemKey {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Id(id) => f.write_str(id),
        }
    }
}

/// An item together with the last observed projection of its properties
#[derive(Debug, Clone)]
pub struct TrackedItem {
    pub item: Item,
    pub snapshot: Json,
}

impl TrackedItem {
    fn capture(tree: &DomTree, item: Item) -> Self {
        Self { item, snapshot: item.to_structured(tree, None) }
    }
}

/// Membership changes found by [`Collection::reindex`]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reindex {
    pub added: Vec<Item>,
    pub removed: Vec<Item>,
}

/// Ordered, dual-indexed registry of top-level items
#[derive(Debug, Default, Clone)]
pub struct Collection {
    anonymous: Vec<TrackedItem>,
    identified: Vec<(String, TrackedItem)>,
    // Items whose key is already held by an earlier item
    shadowed: Vec<(String, TrackedItem)>,
    container_attribute: Option<String>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection that ignores items inside elements carrying `attribute`
    /// (rendered views are derived data, not sources)
    pub fn with_container_attribute(attribute: &str) -> Self {
        Self {
            container_attribute: Some(attribute.to_string()),
            ..Self::default()
        }
    }

    /// Rebuild from the connected document
    pub fn scan(&mut self, tree: &DomTree) -> usize {
        self.anonymous.clear();
        self.identified.clear();
        self.shadowed.clear();

        let mut keys: HashSet<String> = HashSet::new();
        let roots: Vec<NodeId> = tree
            .descendants(NodeId::ROOT)
            .filter(|&n| vocab::is_scope(tree, n))
            .collect();
        for root in roots {
            if !self.is_top_level(tree, root) {
                continue;
            }
            let tracked = TrackedItem::capture(tree, Item::from_scope(root));
            match Identity::of(tree, root).key() {
                Some(key) if keys.insert(key.to_string()) => {
                    self.identified.push((key.to_string(), tracked));
                }
                Some(key) => {
                    tracing::warn!("duplicate item key `{}`; {} is shadowed", key, root);
                    self.shadowed.push((key.to_string(), tracked));
                }
                None => self.anonymous.push(tracked),
            }
        }

        tracing::debug!(
            "scanned {} top-level items ({} anonymous, {} shadowed)",
            self.len(),
            self.anonymous.len(),
            self.shadowed.len()
        );
        self.len()
    }

    /// Connected scope with no scope above it and outside any view container
    pub fn is_top_level(&self, tree: &DomTree, root: NodeId) -> bool {
        vocab::is_scope(tree, root)
            && tree.is_connected(root)
            && !tree.ancestors(root).any(|n| vocab::is_scope(tree, n))
            && !self.in_container(tree, root)
    }

    fn in_container(&self, tree: &DomTree, root: NodeId) -> bool {
        self.container_attribute
            .as_deref()
            .is_some_and(|attr| tree.ancestors(root).any(|n| tree.has_attr(n, attr)))
    }

    /// Track `item` if it is top-level and not yet tracked. An identity key
    /// already in use keeps its first item; the newcomer is still tracked
    /// but only reachable through iteration until the key frees up.
    pub fn add_if_top_level(&mut self, tree: &DomTree, item: Item) -> bool {
        if self.contains(item) || !self.is_top_level(tree, item.root()) {
            return false;
        }

        let tracked = TrackedItem::capture(tree, item);
        match Identity::of(tree, item.root()).key() {
            Some(key) if self.identified.iter().any(|(k, _)| k == key) => {
                tracing::warn!("duplicate item key `{}`; {} is shadowed", key, item.root());
                let entry = (key.to_string(), tracked);
                insert_ordered(tree, &mut self.shadowed, entry, |e| e.1.item);
            }
            Some(key) => {
                let entry = (key.to_string(), tracked);
                insert_ordered(tree, &mut self.identified, entry, |e| e.1.item);
            }
            None => insert_ordered(tree, &mut self.anonymous, tracked, |t| t.item),
        }
        true
    }

    /// Stop tracking `item`. A shadowed item waiting on the freed key takes
    /// it over.
    pub fn remove(&mut self, tree: &DomTree, item: Item) -> bool {
        let before = self.len();
        self.anonymous.retain(|t| t.item != item);
        self.shadowed.retain(|(_, t)| t.item != item);

        if let Some(index) = self.identified.iter().position(|(_, t)| t.item == item) {
            let (key, _) = self.identified.remove(index);
            if let Some(next) = self.shadowed.iter().position(|(k, _)| *k == key) {
                let entry = self.shadowed.remove(next);
                tracing::debug!("item {} now holds key `{}`", entry.1.item.root(), key);
                insert_ordered(tree, &mut self.identified, entry, |e| e.1.item);
            }
        }
        self.len() != before
    }

    /// Rebuild both indexes from the document. Items that stay tracked keep
    /// their snapshots so later diffs still see what changed.
    pub fn reindex(&mut self, tree: &DomTree) -> Reindex {
        let previous: Vec<TrackedItem> = self
            .anonymous
            .drain(..)
            .chain(self.identified.drain(..).map(|(_, t)| t))
            .chain(self.shadowed.drain(..).map(|(_, t)| t))
            .collect();
        self.scan(tree);

        let mut report = Reindex::default();
        for tracked in self.tracked_iter_mut() {
            match previous.iter().find(|p| p.item == tracked.item) {
                Some(old) => tracked.snapshot = old.snapshot.clone(),
                None => report.added.push(tracked.item),
            }
        }
        report.removed = previous
            .into_iter()
            .map(|p| p.item)
            .filter(|&item| !self.contains(item))
            .collect();
        report
    }

    /// Item by position (anonymous items) or by identity key
    pub fn get<K: Into<ItemKey>>(&self, key: K) -> Option<Item> {
        match key.into() {
            ItemKey::Index(index) => self.anonymous.get(index).map(|t| t.item),
            ItemKey::Id(id) => self
                .identified
                .iter()
                .find(|(k, _)| *k == id)
                .map(|(_, t)| t.item),
        }
    }

    /// Key under which `item` is tracked. A shadowed item reports the key
    /// it shares.
    pub fn key_of(&self, item: Item) -> Option<ItemKey> {
        if let Some(index) = self.anonymous.iter().position(|t| t.item == item) {
            return Some(ItemKey::Index(index));
        }
        self.identified
            .iter()
            .chain(&self.shadowed)
            .find(|(_, t)| t.item == item)
            .map(|(k, _)| ItemKey::Id(k.clone()))
    }

    /// Whether `item` is held back by an earlier item with the same key
    pub fn is_shadowed(&self, item: Item) -> bool {
        self.shadowed.iter().any(|(_, t)| t.item == item)
    }

    pub fn contains(&self, item: Item) -> bool {
        self.tracked().any(|t| t.item == item)
    }

    pub fn len(&self) -> usize {
        self.anonymous.len() + self.identified.len() + self.shadowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items: positional ones first, then identified ones, then shadowed
    /// ones, each in document order
    pub fn iter(&self) -> impl Iterator<Item = Item> + '_ {
        self.tracked().map(|t| t.item)
    }

    /// Keys in iteration order
    pub fn keys(&self) -> impl Iterator<Item = ItemKey> + '_ {
        (0..self.anonymous.len()).map(ItemKey::Index).chain(
            self.identified
                .iter()
                .chain(&self.shadowed)
                .map(|(k, _)| ItemKey::Id(k.clone())),
        )
    }

    /// Visit every item with its key
    pub fn for_each(&self, mut f: impl FnMut(ItemKey, Item)) {
        self.keys().zip(self.iter()).for_each(|(key, item)| f(key, item));
    }

    pub fn tracked(&self) -> impl Iterator<Item = &TrackedItem> {
        self.anonymous
            .iter()
            .chain(self.identified.iter().map(|(_, t)| t))
            .chain(self.shadowed.iter().map(|(_, t)| t))
    }

    fn tracked_iter_mut(&mut self) -> impl Iterator<Item = &mut TrackedItem> {
        self.anonymous
            .iter_mut()
            .chain(self.identified.iter_mut().map(|(_, t)| t))
            .chain(self.shadowed.iter_mut().map(|(_, t)| t))
    }

    pub(crate) fn tracked_mut(&mut self, item: Item) -> Option<&mut TrackedItem> {
        self.tracked_iter_mut().find(|t| t.item == item)
    }
}

// Insert keeping document order of the entries' item roots
fn insert_ordered<E>(tree: &DomTree, entries: &mut Vec<E>, entry: E, item: impl Fn(&E) -> Item) {
    let root = item(&entry).root();
    let at = entries
        .iter()
        .position(|e| tree.compare_document_order(item(e).root(), root).is_gt())
        .unwrap_or(entries.len());
    entries.insert(at, entry);
}

impl<'a> IntoIterator for &'a Collection {
    type Item = Item;
    type IntoIter = Box<dyn Iterator<Item = Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
