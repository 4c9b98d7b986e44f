//! The result of merging a set of revisions.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use versio_types::{Revision, VersionProperty};

use crate::state::PropertyState;

/// Merged properties of a set of heads, plus the values they override.
///
/// `properties` holds the winner of every key; `conflicts` lists, per key,
/// the concurrent values that lost. A merge is a pure function of the
/// history it was built from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Merge<K: Ord, V> {
    merge_heads: BTreeSet<Revision>,
    properties: BTreeMap<K, V>,
    conflicts: BTreeMap<K, Vec<VersionProperty<V>>>,
}

impl<K: Ord + Clone, V: Clone + PartialEq> Merge<K, V> {
    /// A merge of nothing: no heads, no properties, no conflicts.
    pub fn empty() -> Self {
        Self {
            merge_heads: BTreeSet::new(),
            properties: BTreeMap::new(),
            conflicts: BTreeMap::new(),
        }
    }

    pub(crate) fn from_state(merge_heads: BTreeSet<Revision>, state: &PropertyState<K, V>) -> Self {
        Self {
            merge_heads,
            properties: state.properties(),
            conflicts: state.conflicts(),
        }
    }

    /// The minimal set of revisions this merge was computed from.
    pub fn merge_heads(&self) -> &BTreeSet<Revision> {
        &self.merge_heads
    }

    pub fn properties(&self) -> &BTreeMap<K, V> {
        &self.properties
    }

    pub fn into_properties(self) -> BTreeMap<K, V> {
        self.properties
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.properties.get(key)
    }

    pub fn conflicts(&self) -> &BTreeMap<K, Vec<VersionProperty<V>>> {
        &self.conflicts
    }

    /// Overridden values of a single key; empty when the key has no conflict.
    pub fn conflicting_values(&self, key: &K) -> &[VersionProperty<V>] {
        self.conflicts.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Returns `true` if the merge selected no heads.
    pub fn is_empty(&self) -> bool {
        self.merge_heads.is_empty()
    }
}
