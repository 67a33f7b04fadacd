//! Remote documents
//!
//! Documents fetched by URL are parsed once and cached. Each keeps its own
//! [`Collection`], built at parse time and never touched by the main
//! document's observer.

use std::rc::Rc;

use livemd_dom::Document;
use livemd_html::HtmlParser;

use crate::cache::{CacheStats, ResourceCache, ResourceSource};
use crate::collection::Collection;
use crate::item::Item;
use crate::vocab;
use crate::Result;

/// A parsed snapshot of a remote document
#[derive(Debug)]
pub struct RemoteDocument {
    document: Document,
    collection: Collection,
}

impl RemoteDocument {
    pub fn parse(url: &str, html: &str) -> Result<Self> {
        let document = HtmlParser::new().parse_with_url(html, url)?;
        let mut collection = Collection::new();
        collection.scan(&document.tree);
        Ok(Self { document, collection })
    }

    pub fn url(&self) -> &str {
        self.document.url()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Item addressed by a fragment: an identity key in the collection, or
    /// the `id` of any scope element (nested items included)
    pub fn item_by_fragment(&self, fragment: &str) -> Option<Item> {
        if let Some(item) = self.collection.get(fragment) {
            return Some(item);
        }
        let element = self.document.get_element_by_id(fragment)?;
        Item::new(&self.document.tree, element).ok()
    }
}

/// Fetches and caches remote documents
#[derive(Debug)]
pub struct DocumentCache<S> {
    source: S,
    cache: ResourceCache<RemoteDocument>,
}

impl<S: ResourceSource> DocumentCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: ResourceCache::new(),
        }
    }

    /// Parsed document at `url`
    pub async fn fetch(&self, url: &str) -> Result<Rc<RemoteDocument>> {
        self.cache
            .get_or_load(url, || async {
                let html = self.source.fetch(url).await?;
                let remote = RemoteDocument::parse(url, &html)?;
                tracing::info!("fetched {} ({} items)", url, remote.collection.len());
                Ok(remote)
            })
            .await
    }

    /// Look up an `itemid` of the form `document-url#fragment`. A reference
    /// without a fragment, or whose fragment names no item, resolves to `None`.
    pub async fn resolve(&self, itemid: &str) -> Result<Option<(Rc<RemoteDocument>, Item)>> {
        let Some((url, fragment)) = itemid.split_once('#') else {
            return Ok(None);
        };
        if url.is_empty() || fragment.is_empty() {
            return Ok(None);
        }
        let remote = self.fetch(url).await?;
        let item = remote
            .collection
            .get(itemid)
            .or_else(|| remote.item_by_fragment(fragment))
            .filter(|item| vocab::is_scope(&remote.document.tree, item.root()));
        Ok(item.map(|item| (remote, item)))
    }

    pub fn invalidate(&self, url: &str) -> bool {
        self.cache.invalidate(url)
    }

    /// Drop every cached document
    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
