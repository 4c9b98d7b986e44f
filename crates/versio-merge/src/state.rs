//! Resolved property state of a point in history.
//!
//! A [`PropertyState`] keeps, per key, the *live* values: the writes that no
//! descendant write has superseded. In a linear history every key has at most
//! one live value. After concurrent lines of history are joined a key may hold
//! several, one per concurrent writer; these are the candidates a merge picks
//! its winner and conflicts from.
//!
//! # Invariants
//!
//! - Live values of a key are sorted by revision and unique per revision.
//! - No live value's revision is an ancestor of another live value's revision
//!   for the same key.
//! - A deletion is kept as a tombstone (`value == None`) so that it keeps
//!   superseding older concurrent writes.
//!
//! Entries live in a [`SharedMap`]: cloning a state is O(1) and applying a
//! changeset copies only the touched paths, so a child version shares the
//! untouched part of its parent's state.

use std::collections::BTreeMap;

use versio_types::{Changeset, Revision, SharedMap, VersionProperty};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyState<K, V> {
    entries: SharedMap<K, Vec<VersionProperty<V>>>,
}

impl<K, V> Default for PropertyState<K, V> {
    fn default() -> Self {
        Self {
            entries: SharedMap::new(),
        }
    }
}

impl<K: Ord + Clone, V: Clone + PartialEq> PropertyState<K, V> {
    /// An empty state: the starting point of roots and reset versions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with at least one live value (tombstones included).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live values of a key, sorted by revision.
    pub fn live(&self, key: &K) -> &[VersionProperty<V>] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate over keys and their live values.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &[VersionProperty<V>])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    // ---------------------------------------------------------------
    // Combination
    // ---------------------------------------------------------------

    /// Join another state into this one.
    ///
    /// Live values of both sides are collected per key; any value whose
    /// revision is an ancestor of another collected value's revision is
    /// superseded and dropped. The operation is commutative and idempotent.
    pub fn union_with<F>(&mut self, other: &Self, is_ancestor: F)
    where
        F: Fn(&Revision, &Revision) -> bool,
    {
        if self.entries.ptr_eq(&other.entries) {
            return;
        }
        for (key, theirs) in other.entries.iter() {
            let merged = match self.entries.get(key) {
                None => theirs.clone(),
                Some(ours) if ours == theirs => continue,
                Some(ours) => {
                    let mut merged = ours.clone();
                    let mut changed = false;
                    for property in theirs {
                        if !merged.iter().any(|p| p.revision == property.revision) {
                            merged.push(property.clone());
                            changed = true;
                        }
                    }
                    if !changed {
                        continue;
                    }

                    merged.sort_by_key(|p| p.revision);
                    let revisions: Vec<Revision> = merged.iter().map(|p| p.revision).collect();
                    merged.retain(|p| {
                        !revisions
                            .iter()
                            .any(|r| *r != p.revision && is_ancestor(&p.revision, r))
                    });
                    merged
                }
            };
            self.entries.insert(key.clone(), merged);
        }
    }

    /// Fold several states into one with [`union_with`](Self::union_with).
    pub fn union_all<'a, I, F>(states: I, is_ancestor: F) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
        F: Fn(&Revision, &Revision) -> bool,
        K: 'a,
        V: 'a,
    {
        let mut states = states.into_iter();
        let Some(first) = states.next() else {
            return Self::new();
        };
        let mut result = first.clone();
        for state in states {
            result.union_with(state, &is_ancestor);
        }
        result
    }

    // ---------------------------------------------------------------
    // Changes
    // ---------------------------------------------------------------

    /// Drop the entries of `changeset` that would not change this state.
    ///
    /// A write is redundant when the key has exactly one live value and it
    /// equals the written value. A deletion is redundant when the key has no
    /// live non-deleted value. Writes over several concurrent values are kept:
    /// they resolve the concurrency even when one side already agrees.
    pub fn reduce(&self, changeset: Changeset<K, V>) -> Changeset<K, V> {
        changeset
            .into_iter()
            .filter(|(key, value)| {
                let live = self.live(key);
                match value {
                    Some(value) => !matches!(live, [only] if only.value.as_ref() == Some(value)),
                    None => live.iter().any(|p| p.value.is_some()),
                }
            })
            .collect()
    }

    /// Apply a changeset written by `revision`.
    ///
    /// Each write becomes the key's single live value. A deletion becomes a
    /// tombstone when the key has live values and is ignored otherwise.
    pub fn apply(&mut self, revision: Revision, changeset: &Changeset<K, V>) {
        for (key, value) in changeset {
            if value.is_none() && !self.entries.contains_key(key) {
                continue;
            }
            self.entries
                .insert(key.clone(), vec![VersionProperty::new(revision, value.clone())]);
        }
    }

    // ---------------------------------------------------------------
    // Resolution
    // ---------------------------------------------------------------

    /// The winning live value of a key: the one with the greatest revision.
    pub fn winner(&self, key: &K) -> Option<&VersionProperty<V>> {
        self.live(key).last()
    }

    /// Resolved value of a key, `None` if absent or deleted.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.winner(key).and_then(|p| p.value.as_ref())
    }

    /// Resolved properties: the winner of every key that is not deleted.
    pub fn properties(&self) -> BTreeMap<K, V> {
        self.entries
            .iter()
            .filter_map(|(key, live)| {
                let winner = live.last()?;
                winner.value.clone().map(|value| (key.clone(), value))
            })
            .collect()
    }

    /// Concurrent values overridden by each key's winner.
    ///
    /// Values equal to the winner's are not conflicts.
    pub fn conflicts(&self) -> BTreeMap<K, Vec<VersionProperty<V>>> {
        self.entries
            .iter()
            .filter_map(|(key, live)| {
                let (winner, rest) = live.split_last()?;
                let losers: Vec<_> = rest
                    .iter()
                    .filter(|p| p.value != winner.value)
                    .cloned()
                    .collect();
                (!losers.is_empty()).then(|| (key.clone(), losers))
            })
            .collect()
    }
}
