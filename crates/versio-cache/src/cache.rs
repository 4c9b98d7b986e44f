//! Memoised graphs over a [`VersionStore`].
//!
//! A [`GraphCache`] keeps one [`VersionGraph`] per document together with
//! the highest publication ordinal it has seen. Refreshing fetches only
//! versions published after that ordinal and commits them onto the cached
//! graph; if they do not fit, the document is reloaded from scratch.
//! Graphs are compacted whenever the cache's [`GraphOptions`] trigger fires.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use versio_graph::VersionGraph;
use versio_store::VersionStore;

use crate::error::{CacheError, CacheResult};
use crate::options::GraphOptions;

type StoreGraph<S> =
    VersionGraph<<S as VersionStore>::Key, <S as VersionStore>::Value, <S as VersionStore>::Meta>;

struct CachedGraph<G> {
    graph: G,
    last_ordinal: u64,
    loaded: u64,
}

struct Entries<Id, G> {
    graphs: BTreeMap<Id, CachedGraph<G>>,
    clock: u64,
}

/// Per-document graph cache.
pub struct GraphCache<S: VersionStore> {
    store: Arc<S>,
    options: GraphOptions<S::Key, S::Value, S::Meta>,
    max_entries: Option<usize>,
    entries: RwLock<Entries<S::Id, StoreGraph<S>>>,
}

impl<S> GraphCache<S>
where
    S: VersionStore,
    S::Key: 'static,
    S::Value: 'static,
    S::Meta: 'static,
{
    /// Cache over `store` that never compacts.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_options(store, GraphOptions::keep_all())
    }

    pub fn with_options(store: Arc<S>, options: GraphOptions<S::Key, S::Value, S::Meta>) -> Self {
        Self {
            store,
            options,
            max_entries: None,
            entries: RwLock::new(Entries {
                graphs: BTreeMap::new(),
                clock: 0,
            }),
        }
    }

    /// Bound the number of cached documents. Once exceeded, the document
    /// loaded longest ago is evicted.
    pub fn max_entries(mut self, max_entries: usize) -> CacheResult<Self> {
        if max_entries == 0 {
            return Err(CacheError::InvalidArgument(
                "max_entries must be at least 1".into(),
            ));
        }
        self.max_entries = Some(max_entries);
        Ok(self)
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn options(&self) -> &GraphOptions<S::Key, S::Value, S::Meta> {
        &self.options
    }

    fn read(&self) -> CacheResult<RwLockReadGuard<'_, Entries<S::Id, StoreGraph<S>>>> {
        self.entries.read().map_err(|_| CacheError::Poisoned)
    }

    fn write(&self) -> CacheResult<RwLockWriteGuard<'_, Entries<S::Id, StoreGraph<S>>>> {
        self.entries.write().map_err(|_| CacheError::Poisoned)
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// The graph of `doc`, fetched from the store on first use.
    ///
    /// A failed first load is returned to the caller and nothing is cached.
    pub fn load(&self, doc: &S::Id) -> CacheResult<StoreGraph<S>> {
        if let Some(cached) = self.read()?.graphs.get(doc) {
            return Ok(cached.graph.clone());
        }

        let (graph, last_ordinal) = self.fetch(doc)?;
        debug!(versions = graph.len(), last_ordinal, "loaded graph into cache");

        let mut entries = self.write()?;
        if let Some(existing) = entries.graphs.get(doc) {
            if existing.last_ordinal >= last_ordinal {
                return Ok(existing.graph.clone());
            }
        }
        entries.clock += 1;
        let loaded = entries.clock;
        entries.graphs.insert(
            doc.clone(),
            CachedGraph {
                graph: graph.clone(),
                last_ordinal,
                loaded,
            },
        );
        self.evict_overflow(&mut entries);
        Ok(graph)
    }

    /// Bring the cached graph of `doc` up to date with the store.
    ///
    /// Documents that are not cached are left alone and `None` is returned.
    /// If fetching fails, the document is cached as an empty graph, so the
    /// next refresh reloads it in full.
    pub fn refresh(&self, doc: &S::Id) -> CacheResult<Option<StoreGraph<S>>> {
        let Some((cached, last_ordinal)) = self
            .read()?
            .graphs
            .get(doc)
            .map(|c| (c.graph.clone(), c.last_ordinal))
        else {
            return Ok(None);
        };

        let (graph, last_ordinal) = match self.fetch_since(doc, cached, last_ordinal) {
            Ok(fetched) => fetched,
            Err(err) => {
                warn!(error = %err, "graph refresh failed, caching empty graph");
                (VersionGraph::new(), 0)
            }
        };

        let mut entries = self.write()?;
        match entries.graphs.get_mut(doc) {
            Some(entry) => {
                entry.graph = graph.clone();
                entry.last_ordinal = last_ordinal;
                Ok(Some(graph))
            }
            // Evicted while fetching.
            None => Ok(None),
        }
    }

    /// Drop `doc` from the cache. Returns `true` if it was cached.
    pub fn evict(&self, doc: &S::Id) -> CacheResult<bool> {
        Ok(self.write()?.graphs.remove(doc).is_some())
    }

    pub fn evict_all(&self) -> CacheResult<()> {
        self.write()?.graphs.clear();
        Ok(())
    }

    pub fn contains(&self, doc: &S::Id) -> CacheResult<bool> {
        Ok(self.read()?.graphs.contains_key(doc))
    }

    /// Number of cached documents.
    pub fn len(&self) -> CacheResult<usize> {
        Ok(self.read()?.graphs.len())
    }

    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.read()?.graphs.is_empty())
    }

    // ---------------------------------------------------------------
    // Fetching
    // ---------------------------------------------------------------

    fn fetch(&self, doc: &S::Id) -> CacheResult<(StoreGraph<S>, u64)> {
        let stored = self.store.load(doc)?;
        let last_ordinal = stored.last().map_or(0, |s| s.ordinal);
        let graph = VersionGraph::init(stored.into_iter().map(|s| s.version))?;
        Ok((self.options.apply(graph)?, last_ordinal))
    }

    fn fetch_since(
        &self,
        doc: &S::Id,
        cached: StoreGraph<S>,
        last_ordinal: u64,
    ) -> CacheResult<(StoreGraph<S>, u64)> {
        let fresh = self.store.load_since(doc, last_ordinal)?;
        let Some(newest) = fresh.last().map(|s| s.ordinal) else {
            return Ok((cached, last_ordinal));
        };

        match cached.commit_all(fresh.into_iter().map(|s| s.version)) {
            Ok(graph) => Ok((self.options.apply(graph)?, newest)),
            Err(err) => {
                debug!(error = %err, "incremental refresh rejected, reloading graph");
                self.fetch(doc)
            }
        }
    }

    fn evict_overflow(&self, entries: &mut Entries<S::Id, StoreGraph<S>>) {
        let Some(max) = self.max_entries else {
            return;
        };
        while entries.graphs.len() > max {
            let oldest = entries
                .graphs
                .iter()
                .min_by_key(|(_, cached)| cached.loaded)
                .map(|(doc, _)| doc.clone());
            match oldest {
                Some(doc) => {
                    entries.graphs.remove(&doc);
                    debug!(cached = entries.graphs.len(), "evicted least recently loaded graph");
                }
                None => break,
            }
        }
    }
}
