//! Graph nodes: versions placed into a history.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use versio_merge::PropertyState;
use versio_types::{Changeset, Revision, Version, VersionType};

/// A version as committed into a [`VersionGraph`](crate::VersionGraph).
///
/// The stored version carries the *effective* changeset: entries that did not
/// change the merged state of the parents are dropped at insertion. Besides
/// the version, a node knows its generation (one more than its deepest
/// parent's, roots are `0`) and the resolved state of its history. Nodes are
/// immutable and shared between graph values; ancestry is answered by the
/// graph, which walks parent edges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionNode<K, V, M = ()> {
    pub(crate) version: Version<K, V, M>,
    pub(crate) generation: u64,
    pub(crate) state: Arc<PropertyState<K, V>>,
}

impl<K: Ord + Clone, V: Clone + PartialEq, M> VersionNode<K, V, M> {
    pub fn revision(&self) -> Revision {
        self.version.revision
    }

    pub fn branch(&self) -> &str {
        &self.version.branch
    }

    pub fn parents(&self) -> &BTreeSet<Revision> {
        &self.version.parents
    }

    pub fn kind(&self) -> VersionType {
        self.version.kind
    }

    pub fn is_reset(&self) -> bool {
        self.version.is_reset()
    }

    /// Changes this version actually made to its history.
    pub fn changeset(&self) -> &Changeset<K, V> {
        &self.version.changeset
    }

    pub fn meta(&self) -> &M {
        &self.version.meta
    }

    /// The committed version, with its effective changeset.
    pub fn version(&self) -> &Version<K, V, M> {
        &self.version
    }

    /// Length of the longest parent chain below this node.
    ///
    /// A strict ancestor always has a smaller generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolved state of this node's history.
    pub fn state(&self) -> &PropertyState<K, V> {
        &self.state
    }

    /// Resolved properties as seen from this node alone.
    pub fn properties(&self) -> BTreeMap<K, V> {
        self.state.properties()
    }

    /// Returns a human-readable summary of this node.
    pub fn summary(&self) -> String {
        format!(
            "{} (generation {}, {} keys)",
            self.version.summary(),
            self.generation,
            self.state.len(),
        )
    }
}
