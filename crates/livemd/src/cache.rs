//! Resource caches
//!
//! Per-URL cache of loaded resources. Concurrent requests for a URL that is
//! still loading wait on the same load instead of starting another one.
//! Successful loads stay cached until invalidated; failures are not cached.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;

use smol::lock::OnceCell;

use crate::{Error, Result};

/// Cache counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls to `get_or_load`
    pub requests: u64,
    /// Served from a settled entry
    pub hits: u64,
    /// Joined a load already in flight
    pub coalesced: u64,
    /// Loads actually started
    pub loads: u64,
    /// Loads that failed
    pub failures: u64,
}

// Shared by every request for one URL; a failure settles it for the
// requests already waiting and is then dropped from the map
type Slot<T> = Rc<OnceCell<Result<Rc<T>, Rc<Error>>>>;

/// URL-keyed cache with load coalescing
pub struct ResourceCache<T> {
    entries: RefCell<HashMap<String, Slot<T>>>,
    stats: Cell<CacheStats>,
}

impl<T> ResourceCache<T> {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
            stats: Cell::new(CacheStats::default()),
        }
    }

    /// Settled value for `url`, loading it with `load` if needed
    pub async fn get_or_load<F, Fut>(&self, url: &str, load: F) -> Result<Rc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.bump(|s| s.requests += 1);
        let (slot, joined) = {
            let mut entries = self.entries.borrow_mut();
            match entries.get(url) {
                Some(slot) => (slot.clone(), true),
                None => {
                    let slot: Slot<T> = Rc::new(OnceCell::new());
                    entries.insert(url.to_string(), slot.clone());
                    (slot, false)
                }
            }
        };

        if let Some(Ok(value)) = slot.get() {
            self.bump(|s| s.hits += 1);
            return Ok(value.clone());
        }
        if joined {
            self.bump(|s| s.coalesced += 1);
        }

        let settled = slot
            .get_or_init(move || async move {
                self.bump(|s| s.loads += 1);
                tracing::debug!("loading {}", url);
                match load().await {
                    Ok(value) => Ok(Rc::new(value)),
                    Err(err) => {
                        self.bump(|s| s.failures += 1);
                        tracing::warn!("{}", err);
                        Err(Rc::new(err))
                    }
                }
            })
            .await;

        match settled {
            Ok(value) => Ok(value.clone()),
            Err(err) => {
                self.forget(url, &slot);
                Err(err.replay(url))
            }
        }
    }

    // Drop a failed slot unless it was already replaced
    fn forget(&self, url: &str, slot: &Slot<T>) {
        let mut entries = self.entries.borrow_mut();
        if entries.get(url).is_some_and(|current| Rc::ptr_eq(current, slot)) {
            entries.remove(url);
        }
    }

    /// Settled value without loading
    pub fn get(&self, url: &str) -> Option<Rc<T>> {
        let entries = self.entries.borrow();
        match entries.get(url)?.get()? {
            Ok(value) => Some(value.clone()),
            Err(_) => None,
        }
    }

    /// Whether a settled value is cached for `url`
    pub fn contains(&self, url: &str) -> bool {
        self.get(url).is_some()
    }

    /// Forget `url`. A load in flight still completes for its callers.
    pub fn invalidate(&self, url: &str) -> bool {
        self.entries.borrow_mut().remove(url).is_some()
    }

    /// Forget everything
    pub fn clear(&self) {
        let count = self.entries.borrow().len();
        self.entries.borrow_mut().clear();
        tracing::debug!("cache cleared ({} entries)", count);
    }

    /// Number of settled entries
    pub fn len(&self) -> usize {
        self.entries
            .borrow()
            .values()
            .filter(|slot| matches!(slot.get(), Some(Ok(_))))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.get()
    }

    fn bump(&self, f: impl FnOnce(&mut CacheStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

impl<T> Default for ResourceCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ResourceCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("entries", &self.len())
            .field("stats", &self.stats.get())
            .finish()
    }
}

/// Where raw resource text comes from
#[allow(async_fn_in_trait)]
pub trait ResourceSource {
    async fn fetch(&self, url: &str) -> Result<String>;
}

impl<S: ResourceSource> ResourceSource for Rc<S> {
    async fn fetch(&self, url: &str) -> Result<String> {
        (**self).fetch(url).await
    }
}

/// In-memory source, mostly for tests and offline use
#[derive(Debug, Default)]
pub struct StaticSource {
    resources: RefCell<HashMap<String, String>>,
    fetches: Cell<usize>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`StaticSource::insert`]
    pub fn with(self, url: &str, body: &str) -> Self {
        self.insert(url, body);
        self
    }

    pub fn insert(&self, url: &str, body: &str) {
        self.resources.borrow_mut().insert(url.to_string(), body.to_string());
    }

    pub fn remove(&self, url: &str) -> Option<String> {
        self.resources.borrow_mut().remove(url)
    }

    /// Number of fetches served or refused
    pub fn fetches(&self) -> usize {
        self.fetches.get()
    }
}

impl ResourceSource for StaticSource {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.fetches.set(self.fetches.get() + 1);
        // Suspend once so overlapping requests really overlap
        smol::future::yield_now().await;
        self.resources
            .borrow()
            .get(url)
            .cloned()
            .ok_or_else(|| Error::load(url, "not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smol::future;

    async fn parse_len(source: &StaticSource, url: &str) -> Result<usize> {
        Ok(source.fetch(url).await?.len())
    }

    #[test]
    fn test_concurrent_loads_coalesce() {
        let source = StaticSource::new().with("mem://a", "hello");
        let cache: ResourceCache<usize> = ResourceCache::new();

        let (a, b) = smol::block_on(future::zip(
            cache.get_or_load("mem://a", || parse_len(&source, "mem://a")),
            cache.get_or_load("mem://a", || parse_len(&source, "mem://a")),
        ));
        assert_eq!(*a.unwrap(), 5);
        assert_eq!(*b.unwrap(), 5);
        assert_eq!(source.fetches(), 1);

        let stats = cache.stats();
        assert_eq!((stats.requests, stats.loads, stats.coalesced), (2, 1, 1));
    }

    #[test]
    fn test_concurrent_failures_coalesce() {
        let source = StaticSource::new();
        let cache: ResourceCache<usize> = ResourceCache::new();

        let (a, b) = smol::block_on(future::zip(
            cache.get_or_load("mem://gone", || parse_len(&source, "mem://gone")),
            cache.get_or_load("mem://gone", || parse_len(&source, "mem://gone")),
        ));
        assert!(matches!(a, Err(Error::Load { ref url, .. }) if url == "mem://gone"));
        assert!(matches!(b, Err(Error::Load { ref url, .. }) if url == "mem://gone"));
        assert_eq!(source.fetches(), 1);

        let stats = cache.stats();
        assert_eq!((stats.loads, stats.coalesced, stats.failures), (1, 1, 1));
        assert!(cache.is_empty());

        source.insert("mem://gone", "back");
        let retry =
            smol::block_on(cache.get_or_load("mem://gone", || parse_len(&source, "mem://gone")));
        assert_eq!(*retry.unwrap(), 4);
        assert_eq!(source.fetches(), 2);
    }

    #[test]
    fn test_settled_value_is_cached() {
        let source = StaticSource::new().with("mem://a", "abc");
        let cache: ResourceCache<usize> = ResourceCache::new();

        smol::block_on(async {
            cache.get_or_load("mem://a", || parse_len(&source, "mem://a")).await.unwrap();
            cache.get_or_load("mem://a", || parse_len(&source, "mem://a")).await.unwrap();
        });
        assert_eq!(source.fetches(), 1);
        assert_eq!(cache.stats().hits, 1);
        assert!(cache.contains("mem://a"));
    }

    #[test]
    fn test_failure_not_cached() {
        let source = StaticSource::new();
        let cache: ResourceCache<usize> = ResourceCache::new();

        let first =
            smol::block_on(cache.get_or_load("mem://late", || parse_len(&source, "mem://late")));
        assert!(matches!(first, Err(Error::Load { ref url, .. }) if url == "mem://late"));
        assert!(cache.is_empty());

        source.insert("mem://late", "ok");
        let second =
            smol::block_on(cache.get_or_load("mem://late", || parse_len(&source, "mem://late")));
        assert_eq!(*second.unwrap(), 2);
        assert_eq!(cache.stats().failures, 1);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let source = StaticSource::new().with("mem://a", "a").with("mem://b", "bb");
        let cache: ResourceCache<usize> = ResourceCache::new();
        smol::block_on(async {
            cache.get_or_load("mem://a", || parse_len(&source, "mem://a")).await.unwrap();
            cache.get_or_load("mem://b", || parse_len(&source, "mem://b")).await.unwrap();
        });
        assert_eq!(cache.len(), 2);

        assert!(cache.invalidate("mem://a"));
        assert!(!cache.contains("mem://a"));
        smol::block_on(cache.get_or_load("mem://a", || parse_len(&source, "mem://a"))).unwrap();
        assert_eq!(source.fetches(), 3);

        cache.clear();
        assert!(cache.is_empty());
    }
}
