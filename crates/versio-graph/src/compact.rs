//! History compaction.
//!
//! Compaction drops versions from a graph while keeping every retained
//! version's resolved properties intact. The retained set is closed under
//! merge bases: whenever two retained versions are concurrent, their nearest
//! common ancestors are retained too, so later merges of the compacted graph
//! still see where the lines of history diverged.
//!
//! Conflicts survive compaction as well. Every writer of a key that has more
//! than one live value, in a retained version or in the join of two
//! concurrent retained versions, is retained. A retained deletion keeps the
//! writers it deleted, since a tombstone over a key its base never had
//! would be discarded.

use std::collections::BTreeSet;

use tracing::debug;

use versio_merge::PropertyState;
use versio_types::{Changeset, Revision, Version};

use crate::error::GraphResult;
use crate::graph::{insert_node, parent_state, GraphInner, VersionGraph};
use crate::node::VersionNode;

impl<K: Ord + Clone, V: Clone + PartialEq, M: Clone> VersionGraph<K, V, M> {
    /// Revisions kept when compacting with `retain`.
    ///
    /// Starts from the retained versions and every branch head, then adds,
    /// until nothing new turns up:
    ///
    /// - the nearest common ancestors of each concurrent pair,
    /// - the writers of every key with several live values, in a retained
    ///   version's state or in the joined states of a concurrent pair,
    /// - for each such writer that deleted the key, the writers live in its
    ///   parents.
    pub fn retained_revisions<F>(&self, retain: F) -> BTreeSet<Revision>
    where
        F: Fn(&VersionNode<K, V, M>) -> bool,
    {
        let mut retained: BTreeSet<Revision> = self
            .versions()
            .filter(|&node| retain(node))
            .map(VersionNode::revision)
            .collect();
        retained.extend(self.head_revisions());

        loop {
            let current: Vec<&VersionNode<K, V, M>> =
                retained.iter().filter_map(|r| self.get(r)).collect();
            let mut added = BTreeSet::new();
            for node in &current {
                self.conflicting_writers(node.state(), &mut added);
            }
            for (i, a) in current.iter().enumerate() {
                for b in &current[i + 1..] {
                    let (ra, rb) = (a.revision(), b.revision());
                    if self.is_ancestor(&ra, &rb) || self.is_ancestor(&rb, &ra) {
                        continue;
                    }
                    added.extend(self.nearest_common_ancestors(&ra, &rb));
                    let joined = PropertyState::union_all([a.state(), b.state()], |x, y| {
                        self.is_ancestor(x, y)
                    });
                    self.conflicting_writers(&joined, &mut added);
                }
            }

            added.retain(|r| !retained.contains(r));
            if added.is_empty() {
                return retained;
            }
            retained.extend(added);
        }
    }

    /// Writers of keys with several live values in `state`, and for each
    /// deletion among them the writers it superseded.
    fn conflicting_writers(&self, state: &PropertyState<K, V>, out: &mut BTreeSet<Revision>) {
        for (key, live) in state.iter() {
            if live.len() < 2 {
                continue;
            }
            for property in live {
                out.insert(property.revision);
                if !property.is_deletion() {
                    continue;
                }
                let Some(writer) = self.get(&property.revision) else {
                    continue;
                };
                for parent in writer.parents().iter().filter_map(|p| self.get(p)) {
                    out.extend(parent.state().live(key).iter().map(|p| p.revision));
                }
            }
        }
    }

    /// Compact this graph, keeping the versions selected by `retain` plus
    /// those listed by [`retained_revisions`](Self::retained_revisions).
    ///
    /// Each kept version is re-parented onto its nearest kept ancestors and
    /// its changeset is rewritten against them, so its resolved properties
    /// and the conflicts of merges over kept versions do not change. Reset
    /// versions keep their own changeset.
    pub fn compact<F>(&self, retain: F) -> GraphResult<Self>
    where
        F: Fn(&VersionNode<K, V, M>) -> bool,
    {
        let retained = self.retained_revisions(retain);

        let mut compacted = GraphInner::default();
        for node in self.topological_order() {
            if !retained.contains(&node.revision()) {
                continue;
            }

            let candidates: BTreeSet<Revision> = self
                .ancestors(&node.revision())
                .intersection(&retained)
                .copied()
                .collect();
            let dominated = self.ancestors_of_all(candidates.iter().copied());
            let parents: BTreeSet<Revision> =
                candidates.difference(&dominated).copied().collect();

            let changeset = if node.is_reset() {
                node.changeset().clone()
            } else {
                let (_, base) = parent_state(&compacted.nodes, node.revision(), &parents, false)?;
                rebased_changeset(node, &base)
            };

            let version = Version {
                revision: node.revision(),
                branch: node.branch().to_string(),
                parents,
                kind: node.kind(),
                changeset,
                meta: node.meta().clone(),
            };
            insert_node(&mut compacted, version)?;
        }

        debug!(
            before = self.len(),
            after = compacted.nodes.len(),
            "compacted version graph"
        );
        Ok(Self::from_inner(compacted))
    }
}

/// Changes that turn `base` into the node's resolved state.
///
/// Keys whose live values already match are left alone, which keeps
/// conflicts between retained writers as they were.
fn rebased_changeset<K, V, M>(
    node: &VersionNode<K, V, M>,
    base: &PropertyState<K, V>,
) -> Changeset<K, V>
where
    K: Ord + Clone,
    V: Clone + PartialEq,
{
    let state = node.state();
    let keys: BTreeSet<&K> = state.iter().chain(base.iter()).map(|(k, _)| k).collect();

    keys.into_iter()
        .filter(|key| base.live(key) != state.live(key))
        .map(|key| (key.clone(), state.get(key).cloned()))
        .collect()
}
