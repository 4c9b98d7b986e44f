use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use versio_cache::GraphCache;
use versio_graph::{GraphError, VersionGraph};
use versio_merge::Merge;
use versio_path::{diff, from_properties, to_properties, PropertyPath, PropertyValue};
use versio_store::VersionStore;
use versio_types::{RevisionClock, Version, VersionBuilder};

use crate::config::VersioConfig;
use crate::error::VersioResult;

/// A version of a flattened document.
pub type DocumentVersion<M = ()> = Version<PropertyPath, PropertyValue, M>;

/// The history of one document.
pub type DocumentGraph<M = ()> = VersionGraph<PropertyPath, PropertyValue, M>;

/// Versioned documents over a store.
///
/// Ties a [`RevisionClock`] for this writer, a [`VersionStore`] holding the
/// history of every document, and a [`GraphCache`] over that store.
pub struct DocumentRepository<S: VersionStore> {
    clock: RevisionClock,
    default_branch: String,
    cache: GraphCache<S>,
}

impl<S> DocumentRepository<S>
where
    S: VersionStore<Key = PropertyPath, Value = PropertyValue>,
    S::Meta: 'static,
{
    /// Open a repository over `store` with the given settings.
    pub fn new(store: Arc<S>, config: &VersioConfig) -> VersioResult<Self> {
        let mut cache = GraphCache::with_options(store, config.cache.graph_options());
        if let Some(max_entries) = config.cache.max_entries {
            cache = cache.max_entries(max_entries)?;
        }
        Ok(Self {
            clock: RevisionClock::new(config.writer_id),
            default_branch: config.default_branch.clone(),
            cache,
        })
    }

    pub fn clock(&self) -> &RevisionClock {
        &self.clock
    }

    pub fn cache(&self) -> &GraphCache<S> {
        &self.cache
    }

    pub fn default_branch(&self) -> &str {
        &self.default_branch
    }

    /// The current history of `doc`.
    pub fn graph(&self, doc: &S::Id) -> VersioResult<DocumentGraph<S::Meta>> {
        Ok(self.cache.load(doc)?)
    }

    /// Start a version on `branch` with a fresh revision.
    pub fn builder(&self, branch: &str) -> VersionBuilder<PropertyPath, PropertyValue> {
        Version::builder(self.clock.next()).branch(branch)
    }

    /// Commit `version` to `doc`.
    ///
    /// The version is checked against the cached history first, so a
    /// duplicate revision or unknown parent is rejected before anything is
    /// stored. A parent the cached graph compacted away is checked against
    /// the stored history instead. Returns the refreshed history.
    pub fn commit(
        &self,
        doc: &S::Id,
        version: DocumentVersion<S::Meta>,
    ) -> VersioResult<DocumentGraph<S::Meta>> {
        self.clock.observe(&version.revision);
        let revision = version.revision;

        let store = self.cache.store();
        let graph = self.cache.load(doc)?;
        match graph.commit(version.clone()) {
            Ok(_) => {}
            Err(GraphError::InvalidParent { parent, .. }) => {
                debug!(parent = %parent.short_hex(), "parent not cached, checking stored history");
                store.load_graph(doc)?.commit(version.clone())?;
            }
            Err(err) => return Err(err.into()),
        }

        store.append(doc, vec![version])?;
        store.publish()?;
        debug!(revision = %revision.short_hex(), "committed document version");

        match self.cache.refresh(doc)? {
            Some(graph) => Ok(graph),
            None => Ok(self.cache.load(doc)?),
        }
    }

    /// Record `object` as the new state of `branch`.
    ///
    /// The new version's parents are the branch heads and its changeset is
    /// the difference between `object` and the merge of those heads. Keys
    /// in conflict are written again, so the commit resolves them. Returns
    /// `None` when there is nothing to record.
    pub fn commit_object<T>(
        &self,
        doc: &S::Id,
        branch: &str,
        object: &T,
    ) -> VersioResult<Option<DocumentVersion<S::Meta>>>
    where
        T: Serialize + ?Sized,
        S::Meta: Default,
    {
        let graph = self.cache.load(doc)?;
        let merge = graph.merge_branches([branch])?;
        let properties = to_properties(object)?;

        let mut changeset = diff(merge.properties(), &properties);
        for key in merge.conflicts().keys() {
            changeset
                .entry(key.clone())
                .or_insert_with(|| properties.get(key).cloned());
        }

        let parents = graph.branch_head_revisions(branch);
        if changeset.is_empty() && parents.len() <= 1 {
            return Ok(None);
        }

        let version = self
            .builder(branch)
            .parents(parents)
            .changeset(changeset)
            .meta(S::Meta::default())
            .build();
        self.commit(doc, version.clone())?;
        Ok(Some(version))
    }

    /// Merge the heads of `branches` in `doc`.
    pub fn merge_branches<I, B>(
        &self,
        doc: &S::Id,
        branches: I,
    ) -> VersioResult<Merge<PropertyPath, PropertyValue>>
    where
        I: IntoIterator<Item = B>,
        B: Into<String>,
    {
        Ok(self.cache.load(doc)?.merge_branches(branches)?)
    }

    /// Rebuild an object from the merge of `branches`.
    ///
    /// An empty merge rebuilds from no properties at all, which only
    /// deserializes into types such as `Option<T>`.
    pub fn load_object<T, I, B>(&self, doc: &S::Id, branches: I) -> VersioResult<T>
    where
        T: DeserializeOwned,
        I: IntoIterator<Item = B>,
        B: Into<String>,
    {
        let merge = self.merge_branches(doc, branches)?;
        Ok(from_properties(merge.properties())?)
    }

    /// Rebuild an object from the default branch.
    pub fn load<T>(&self, doc: &S::Id) -> VersioResult<T>
    where
        T: DeserializeOwned,
    {
        self.load_object(doc, [self.default_branch.as_str()])
    }
}
