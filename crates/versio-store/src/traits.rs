use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use versio_graph::VersionGraph;
use versio_types::{Revision, Version};

use crate::error::StoreResult;

/// A published version together with its publication ordinal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "K: Serialize, V: Serialize, M: Serialize",
    deserialize = "K: Ord + Deserialize<'de>, V: Deserialize<'de>, M: Deserialize<'de>"
))]
pub struct StoredVersion<K, V, M = ()> {
    /// Position in the store-wide publication order, starting at 1.
    pub ordinal: u64,
    pub version: Version<K, V, M>,
}

/// Durable, per-document version history.
///
/// All implementations must satisfy these invariants:
/// - Appended versions are invisible to loads until [`publish`](Self::publish).
/// - Publishing assigns strictly increasing ordinals across all documents,
///   in append order. Ordinals are unrelated to revision order.
/// - A revision is stored at most once per document.
/// - Concurrent reads are always safe.
pub trait VersionStore: Send + Sync {
    /// Document identifier.
    type Id: Ord + Clone;
    type Key: Ord + Clone;
    type Value: Clone + PartialEq;
    type Meta: Clone;

    /// Stage versions for `doc`.
    ///
    /// Fails with [`StoreError::DuplicateRevision`](crate::StoreError::DuplicateRevision)
    /// if a revision is already stored for the document or repeats in the batch.
    /// A failed append stages nothing.
    fn append(
        &self,
        doc: &Self::Id,
        versions: Vec<Version<Self::Key, Self::Value, Self::Meta>>,
    ) -> StoreResult<()>;

    /// Publish every staged version, returning the published revisions per
    /// document.
    fn publish(&self) -> StoreResult<BTreeMap<Self::Id, Vec<Revision>>>;

    /// Published versions of `doc` with an ordinal greater than `after`,
    /// in ordinal order.
    fn load_since(
        &self,
        doc: &Self::Id,
        after: u64,
    ) -> StoreResult<Vec<StoredVersion<Self::Key, Self::Value, Self::Meta>>>;

    /// Highest ordinal published so far, or 0.
    fn last_ordinal(&self) -> StoreResult<u64>;

    /// Replace the published history of `doc` with a compacted graph.
    ///
    /// The versions kept are those in `compacted` and those published after
    /// the newest of them. The stored history is compacted down to that set,
    /// so versions published later keep the ancestors they build on and their
    /// merge bases. Kept versions keep their ordinals. Every other published
    /// version of the document is dropped.
    fn optimize(
        &self,
        doc: &Self::Id,
        compacted: &VersionGraph<Self::Key, Self::Value, Self::Meta>,
    ) -> StoreResult<()>;

    /// All published versions of `doc`, in ordinal order.
    fn load(
        &self,
        doc: &Self::Id,
    ) -> StoreResult<Vec<StoredVersion<Self::Key, Self::Value, Self::Meta>>> {
        self.load_since(doc, 0)
    }

    /// Load `doc` into a graph.
    fn load_graph(
        &self,
        doc: &Self::Id,
    ) -> StoreResult<VersionGraph<Self::Key, Self::Value, Self::Meta>> {
        let versions = self.load(doc)?.into_iter().map(|stored| stored.version);
        Ok(VersionGraph::init(versions)?)
    }
}
