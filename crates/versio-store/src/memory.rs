use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use versio_graph::VersionGraph;
use versio_types::{Revision, Version};

use crate::error::{StoreError, StoreResult};
use crate::traits::{StoredVersion, VersionStore};

struct DocumentLog<K, V, M> {
    published: Vec<StoredVersion<K, V, M>>,
    pending: Vec<Version<K, V, M>>,
    revisions: BTreeSet<Revision>,
}

impl<K, V, M> Default for DocumentLog<K, V, M> {
    fn default() -> Self {
        Self {
            published: Vec::new(),
            pending: Vec::new(),
            revisions: BTreeSet::new(),
        }
    }
}

struct StoreState<Id, K, V, M> {
    documents: BTreeMap<Id, DocumentLog<K, V, M>>,
    last_ordinal: u64,
}

/// In-memory version store.
///
/// Intended for tests and embedding. All documents are held behind a
/// `RwLock`; ordinals are assigned under the write lock, so concurrent
/// publishers never interleave.
pub struct InMemoryVersionStore<Id, K, V, M = ()> {
    state: RwLock<StoreState<Id, K, V, M>>,
}

impl<Id, K, V, M> InMemoryVersionStore<Id, K, V, M> {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState {
                documents: BTreeMap::new(),
                last_ordinal: 0,
            }),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, StoreState<Id, K, V, M>>> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, StoreState<Id, K, V, M>>> {
        self.state.write().map_err(|_| StoreError::Poisoned)
    }
}

impl<Id: Ord + Clone, K, V, M> InMemoryVersionStore<Id, K, V, M> {
    /// Identifiers of every document with at least one appended version.
    pub fn documents(&self) -> StoreResult<Vec<Id>> {
        Ok(self.read()?.documents.keys().cloned().collect())
    }

    /// Number of appended but unpublished versions.
    pub fn pending_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.documents.values().map(|d| d.pending.len()).sum())
    }
}

impl<Id, K, V, M> Default for InMemoryVersionStore<Id, K, V, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id, K, V, M> VersionStore for InMemoryVersionStore<Id, K, V, M>
where
    Id: Ord + Clone + Send + Sync,
    K: Ord + Clone + Send + Sync,
    V: Clone + PartialEq + Send + Sync,
    M: Clone + Send + Sync,
{
    type Id = Id;
    type Key = K;
    type Value = V;
    type Meta = M;

    fn append(&self, doc: &Id, versions: Vec<Version<K, V, M>>) -> StoreResult<()> {
        let mut state = self.write()?;
        let log = state.documents.entry(doc.clone()).or_default();

        let mut batch = BTreeSet::new();
        for version in &versions {
            if log.revisions.contains(&version.revision) || !batch.insert(version.revision) {
                return Err(StoreError::DuplicateRevision(version.revision));
            }
        }

        debug!(count = versions.len(), "appended versions");
        log.revisions.extend(batch);
        log.pending.extend(versions);
        Ok(())
    }

    fn publish(&self) -> StoreResult<BTreeMap<Id, Vec<Revision>>> {
        let mut state = self.write()?;
        let StoreState {
            documents,
            last_ordinal,
        } = &mut *state;

        let mut published = BTreeMap::new();
        for (doc, log) in documents.iter_mut() {
            if log.pending.is_empty() {
                continue;
            }
            let mut revisions = Vec::with_capacity(log.pending.len());
            for version in log.pending.drain(..) {
                *last_ordinal += 1;
                revisions.push(version.revision);
                log.published.push(StoredVersion {
                    ordinal: *last_ordinal,
                    version,
                });
            }
            published.insert(doc.clone(), revisions);
        }

        if !published.is_empty() {
            info!(
                documents = published.len(),
                last_ordinal = *last_ordinal,
                "published versions"
            );
        }
        Ok(published)
    }

    fn load_since(&self, doc: &Id, after: u64) -> StoreResult<Vec<StoredVersion<K, V, M>>> {
        let state = self.read()?;
        let Some(log) = state.documents.get(doc) else {
            return Ok(Vec::new());
        };
        // Published rows are in ordinal order.
        let start = log.published.partition_point(|stored| stored.ordinal <= after);
        Ok(log.published[start..].to_vec())
    }

    fn last_ordinal(&self) -> StoreResult<u64> {
        Ok(self.read()?.last_ordinal)
    }

    fn optimize(&self, doc: &Id, compacted: &VersionGraph<K, V, M>) -> StoreResult<()> {
        let mut state = self.write()?;
        let Some(log) = state.documents.get_mut(doc) else {
            return Ok(());
        };

        let cutoff = log
            .published
            .iter()
            .filter(|stored| compacted.contains(&stored.version.revision))
            .map(|stored| stored.ordinal)
            .max()
            .unwrap_or(0);

        // Versions published after the compaction point on a line of history
        // the compacted graph no longer has still need their parents.
        let keep: BTreeSet<Revision> = log
            .published
            .iter()
            .filter(|stored| {
                compacted.contains(&stored.version.revision) || stored.ordinal > cutoff
            })
            .map(|stored| stored.version.revision)
            .collect();
        let full = VersionGraph::init(log.published.iter().map(|s| s.version.clone()))?;
        let rewritten = full.compact(|node| keep.contains(&node.revision()))?;

        let before = log.published.len();
        log.published = std::mem::take(&mut log.published)
            .into_iter()
            .filter_map(|stored| {
                let node = rewritten.get(&stored.version.revision)?;
                Some(StoredVersion {
                    ordinal: stored.ordinal,
                    version: node.version().clone(),
                })
            })
            .collect();

        debug!(before, after = log.published.len(), "optimized document");
        Ok(())
    }
}

impl<Id, K, V, M> std::fmt::Debug for InMemoryVersionStore<Id, K, V, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("InMemoryVersionStore");
        if let Ok(state) = self.state.read() {
            s.field("documents", &state.documents.len())
                .field("last_ordinal", &state.last_ordinal);
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Store = InMemoryVersionStore<String, String, String>;

    fn rev(n: u64) -> Revision {
        Revision::new(n, 0)
    }

    fn make_version(n: u64, parents: &[u64]) -> Version<String, String> {
        Version::builder(rev(n))
            .parents(parents.iter().map(|p| rev(*p)))
            .set(format!("k{n}"), format!("v{n}"))
            .build()
    }

    fn doc(name: &str) -> String {
        name.to_string()
    }

    fn revisions(stored: &[StoredVersion<String, String>]) -> Vec<u64> {
        stored.iter().map(|s| s.version.revision.time()).collect()
    }

    #[test]
    fn appended_versions_are_invisible_until_published() {
        let store = Store::new();
        store.append(&doc("a"), vec![make_version(1, &[])]).unwrap();

        assert!(store.load(&doc("a")).unwrap().is_empty());
        assert_eq!(store.pending_count().unwrap(), 1);
        assert_eq!(store.last_ordinal().unwrap(), 0);

        store.publish().unwrap();
        assert_eq!(revisions(&store.load(&doc("a")).unwrap()), vec![1]);
        assert_eq!(store.pending_count().unwrap(), 0);
    }

    #[test]
    fn ordinals_follow_append_order_across_documents() {
        let store = Store::new();
        store
            .append(&doc("b"), vec![make_version(5, &[]), make_version(2, &[])])
            .unwrap();
        store.append(&doc("a"), vec![make_version(9, &[])]).unwrap();

        let published = store.publish().unwrap();
        assert_eq!(published[&doc("a")], vec![rev(9)]);
        assert_eq!(published[&doc("b")], vec![rev(5), rev(2)]);

        let b = store.load(&doc("b")).unwrap();
        assert_eq!(revisions(&b), vec![5, 2]);
        assert!(b[0].ordinal < b[1].ordinal);
        assert_eq!(store.last_ordinal().unwrap(), 3);
    }

    #[test]
    fn publish_without_pending_is_empty() {
        let store = Store::new();
        assert!(store.publish().unwrap().is_empty());
        assert_eq!(store.last_ordinal().unwrap(), 0);
    }

    #[test]
    fn duplicate_revisions_are_rejected() {
        let store = Store::new();
        store.append(&doc("a"), vec![make_version(1, &[])]).unwrap();

        let err = store
            .append(&doc("a"), vec![make_version(2, &[1]), make_version(1, &[])])
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateRevision(r) if r == rev(1)));
        assert!(err.is_invalid_argument());
        // Nothing from the failed batch is staged.
        assert_eq!(store.pending_count().unwrap(), 1);

        let err = store
            .append(&doc("a"), vec![make_version(3, &[]), make_version(3, &[])])
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateRevision(r) if r == rev(3)));

        // Other documents have their own revisions.
        store.append(&doc("b"), vec![make_version(1, &[])]).unwrap();
    }

    #[test]
    fn load_since_skips_seen_ordinals() {
        let store = Store::new();
        store.append(&doc("a"), vec![make_version(1, &[])]).unwrap();
        store.publish().unwrap();
        let seen = store.last_ordinal().unwrap();

        store.append(&doc("b"), vec![make_version(1, &[])]).unwrap();
        store.append(&doc("a"), vec![make_version(2, &[1])]).unwrap();
        store.publish().unwrap();

        let fresh = store.load_since(&doc("a"), seen).unwrap();
        assert_eq!(revisions(&fresh), vec![2]);
        assert!(store.load_since(&doc("missing"), 0).unwrap().is_empty());
    }

    #[test]
    fn load_graph_builds_published_history() {
        let store = Store::new();
        store
            .append(&doc("a"), vec![make_version(2, &[1]), make_version(1, &[])])
            .unwrap();
        store.publish().unwrap();

        let graph = store.load_graph(&doc("a")).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.head_revisions(), BTreeSet::from([rev(2)]));
    }

    #[test]
    fn load_graph_reports_missing_parent() {
        let store = Store::new();
        store.append(&doc("a"), vec![make_version(2, &[1])]).unwrap();
        store.publish().unwrap();

        let err = store.load_graph(&doc("a")).unwrap_err();
        assert!(matches!(err, StoreError::Graph(_)));
    }

    #[test]
    fn optimize_keeps_ordinals_and_newer_versions() {
        let store = Store::new();
        store
            .append(
                &doc("a"),
                vec![make_version(1, &[]), make_version(2, &[1]), make_version(3, &[2])],
            )
            .unwrap();
        store.publish().unwrap();
        let before = store.load(&doc("a")).unwrap();

        let graph = store.load_graph(&doc("a")).unwrap();
        let compacted = graph.compact(|node| node.revision() == rev(3)).unwrap();

        store.append(&doc("a"), vec![make_version(4, &[3])]).unwrap();
        store.publish().unwrap();
        store.optimize(&doc("a"), &compacted).unwrap();

        let after = store.load(&doc("a")).unwrap();
        assert_eq!(revisions(&after), vec![3, 4]);
        assert_eq!(after[0].ordinal, before[2].ordinal);
        assert!(after[0].version.parents.is_empty());
        assert_eq!(after[0].version.changeset.len(), 3);

        let reloaded = store.load_graph(&doc("a")).unwrap();
        assert_eq!(
            reloaded.version_node(&rev(4)).unwrap().properties(),
            graph.commit(make_version(4, &[3])).unwrap().version_node(&rev(4)).unwrap().properties()
        );
    }

    #[test]
    fn optimize_keeps_parents_of_late_concurrent_versions() {
        let store = Store::new();
        store
            .append(
                &doc("a"),
                vec![make_version(1, &[]), make_version(2, &[1]), make_version(3, &[2])],
            )
            .unwrap();
        store.publish().unwrap();

        let graph = store.load_graph(&doc("a")).unwrap();
        let compacted = graph.compact(|_| false).unwrap();
        assert_eq!(compacted.len(), 1);

        // Published after compaction, on top of a version it dropped.
        store.append(&doc("a"), vec![make_version(4, &[2])]).unwrap();
        store.publish().unwrap();
        let expected = store
            .load_graph(&doc("a"))
            .unwrap()
            .version_node(&rev(4))
            .unwrap()
            .properties();

        store.optimize(&doc("a"), &compacted).unwrap();

        let after = store.load(&doc("a")).unwrap();
        assert_eq!(revisions(&after), vec![2, 3, 4]);
        let reloaded = store.load_graph(&doc("a")).unwrap();
        assert_eq!(reloaded.version_node(&rev(4)).unwrap().properties(), expected);
        assert_eq!(reloaded.version_node(&rev(3)).unwrap().parents(), &BTreeSet::from([rev(2)]));
    }
}
