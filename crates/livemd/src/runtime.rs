//! Microdata runtime
//!
//! Owns a document and keeps its item collection and view containers in
//! step with it. Writes through the runtime reach the tree immediately;
//! observers run when the host calls [`Microdata::flush`].

use livemd_dom::{Document, DomTree, MutationRecord, NodeId};
use livemd_html::HtmlParser;
use serde_json::{Map, Value as Json};
use url::Url;

use crate::collection::{Collection, ItemKey};
use crate::config::Config;
use crate::item::{Item, PropertyInput, PropertyValue};
use crate::observer::{ChangeEvent, ChangeObserver};
use crate::scope;
use crate::sync::{Container, SyncReport, TemplateSynchronizer};
use crate::vocab;
use crate::Result;

/// Live microdata view of one document
#[derive(Debug)]
pub struct Microdata {
    document: Document,
    collection: Collection,
    observer: ChangeObserver,
    sync: TemplateSynchronizer,
    config: Config,
}

impl Microdata {
    /// Runtime with default configuration
    pub fn new(document: Document) -> Self {
        Self::with_config(document, Config::default())
    }

    /// Scan the document, start observing it and render registered containers
    pub fn with_config(mut document: Document, config: Config) -> Self {
        let mut collection = Collection::with_container_attribute(&config.container_attribute);
        collection.scan(&document.tree);

        let observer = ChangeObserver::new().with_structural_attribute(&config.container_attribute);
        observer.attach(&mut document.tree);

        let mut runtime = Self {
            document,
            collection,
            observer,
            sync: TemplateSynchronizer::new(&config.container_attribute),
            config,
        };
        if runtime.config.sync_templates {
            runtime.sync.discover(&runtime.document.tree);
            let base = runtime.base_url();
            runtime.sync.sync_all(&mut runtime.document.tree, base.as_ref());
        }
        runtime.document.tree.take_records();

        tracing::info!(
            "microdata ready: {} items, {} containers",
            runtime.collection.len(),
            runtime.sync.containers().len()
        );
        runtime
    }

    /// Parse `html` as the document at `url`
    pub fn from_html(html: &str, url: &str, config: Config) -> Result<Self> {
        let document = HtmlParser::new().parse_with_url(html, url)?;
        Ok(Self::with_config(document, config))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable document access. Changes made here are external and show up
    /// in the next [`Microdata::flush`].
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn tree(&self) -> &DomTree {
        &self.document.tree
    }

    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.document.tree
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn synchronizer(&self) -> &TemplateSynchronizer {
        &self.sync
    }

    /// Registered view containers
    pub fn containers(&self) -> &[Container] {
        self.sync.containers()
    }

    /// Base for `@id`: the configured base URL, else `<base href>` resolved
    /// against the document URL, else the document URL
    pub fn base_url(&self) -> Option<Url> {
        if let Some(base) = &self.config.base_url {
            return Url::parse(base).ok();
        }
        let document_url = Url::parse(self.document.url()).ok();
        match (self.document.base_href(), document_url) {
            (Some(href), Some(url)) => url.join(href).ok().or(Some(url)),
            (Some(href), None) => Url::parse(href).ok(),
            (None, url) => url,
        }
    }

    /// Item for any scope element, top-level or not
    pub fn item_for(&self, element: NodeId) -> Result<Item> {
        Item::new(&self.document.tree, element)
    }

    /// Top-level items in collection order
    pub fn items(&self) -> impl Iterator<Item = Item> + '_ {
        self.collection.iter()
    }

    /// Top-level item by position or identity key
    pub fn get<K: Into<ItemKey>>(&self, key: K) -> Option<Item> {
        self.collection.get(key)
    }

    /// Read a property of `item`
    pub fn value(&self, item: Item, name: &str) -> Option<PropertyValue> {
        item.get(&self.document.tree, name)
    }

    /// Write a property of `item`
    pub fn set(&mut self, item: Item, name: &str, value: impl Into<PropertyInput>) -> Result<()> {
        item.set_with(&mut self.document.tree, name, value, &self.config.default_element)
    }

    /// Apply a plain record to `item`
    pub fn assign(&mut self, item: Item, record: &Map<String, Json>) -> Result<()> {
        item.assign_with(&mut self.document.tree, record, &self.config.default_element)
    }

    /// JSON-LD projection of `item`
    pub fn structured(&self, item: Item) -> Json {
        item.to_structured(&self.document.tree, self.base_url().as_ref())
    }

    /// Deliver the pending mutation batch.
    ///
    /// Returns structural events and property changes caused by external
    /// edits. Changes caused by the runtime's own writes update the
    /// collection silently but still re-render affected views.
    pub fn flush(&mut self) -> Vec<ChangeEvent> {
        let records = self.document.tree.take_records();
        if records.is_empty() {
            return Vec::new();
        }
        let events = self
            .observer
            .process(&self.document.tree, &mut self.collection, &records);
        if self.config.sync_templates {
            self.sync_after(&events, &records);
        }
        events.into_iter().filter(|e| !e.is_internal()).collect()
    }

    /// Deliver pending changes, then rebuild the collection and re-render
    /// every container
    pub fn rescan(&mut self) -> Vec<ChangeEvent> {
        let mut events = self.flush();
        let report = self.collection.reindex(&self.document.tree);
        events.extend(report.removed.into_iter().map(ChangeEvent::ItemRemoved));
        events.extend(report.added.into_iter().map(ChangeEvent::ItemAdded));
        events.push(ChangeEvent::Rescanned);

        if self.config.sync_templates {
            self.sync.discover(&self.document.tree);
            let base = self.base_url();
            self.sync.sync_all(&mut self.document.tree, base.as_ref());
            self.document.tree.take_records();
        }
        events
    }

    fn sync_after(&mut self, events: &[ChangeEvent], records: &[MutationRecord]) -> SyncReport {
        let fresh = self.sync.discover(&self.document.tree);
        let base = self.base_url();

        let report = if events.contains(&ChangeEvent::Rescanned) {
            self.sync.sync_all(&mut self.document.tree, base.as_ref())
        } else {
            let types = affected_types(&self.document.tree, events, records);
            let targets: Vec<NodeId> = self
                .sync
                .containers()
                .iter()
                .filter(|c| fresh.contains(&c.element()) || types.iter().any(|t| t == c.schema()))
                .map(Container::element)
                .collect();
            self.sync.sync_containers(&mut self.document.tree, &targets, base.as_ref())
        };

        // View updates touch no tracked item
        self.document.tree.take_records();
        report
    }
}

// Types of every item touched by `events`, nested items included, plus the
// types of scopes inside removed subtrees (those are no longer reachable
// from any tracked item)
fn affected_types(
    tree: &DomTree,
    events: &[ChangeEvent],
    records: &[MutationRecord],
) -> Vec<String> {
    let touched = events.iter().filter_map(ChangeEvent::item).map(|item| item.root());
    let removed = records.iter().flat_map(|r| r.removed_nodes.iter().copied());

    let mut types: Vec<String> = Vec::new();
    for node in touched.chain(removed) {
        for root in scope::scopes_within(tree, node) {
            for type_url in vocab::item_types(tree, root) {
                if !types.iter().any(|t| t == type_url) {
                    types.push(type_url.to_string());
                }
            }
        }
    }
    types
}
