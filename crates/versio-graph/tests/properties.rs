//! Property-based tests for graph construction and merging.
//!
//!  - Insertion order independence: any input order builds the same graph
//!  - Batch equivalence: one batch equals one commit per version
//!  - Commutativity and idempotence of merges
//!  - Ancestor domination: merging with an ancestor changes nothing
//!  - Reset containment: a reset only carries its own writes

use std::collections::BTreeSet;

use proptest::prelude::*;
use versio_graph::VersionGraph;
use versio_types::{Revision, Version};

type Graph = VersionGraph<String, u8>;

/// (parent picks, changes, alt branch, reset)
type Draft = (Vec<usize>, Vec<(u8, Option<u8>)>, bool, bool);

fn rev(n: usize) -> Revision {
    Revision::new(n as u64 + 1, 0)
}

/// Random histories: version `i` picks its parents among versions `0..i`.
fn history_strategy() -> impl Strategy<Value = Vec<Version<String, u8>>> {
    let draft = (
        prop::collection::vec(any::<usize>(), 0..3),
        prop::collection::vec((0u8..4, prop::option::of(0u8..3)), 0..4),
        any::<bool>(),
        prop::bool::weighted(0.1),
    );
    prop::collection::vec(draft, 1..12).prop_map(|drafts: Vec<Draft>| {
        drafts
            .into_iter()
            .enumerate()
            .map(|(i, (picks, changes, alt, reset))| {
                let parents: BTreeSet<Revision> = if i == 0 {
                    BTreeSet::new()
                } else {
                    picks.iter().map(|p| rev(p % i)).collect()
                };
                let builder = Version::builder(rev(i))
                    .branch(if alt { "alt" } else { "default" })
                    .parents(parents)
                    .changeset(changes.into_iter().map(|(k, v)| (format!("k{k}"), v)));
                let builder = if reset { builder.reset() } else { builder };
                builder.build()
            })
            .collect()
    })
}

fn shuffled_history() -> impl Strategy<Value = (Vec<Version<String, u8>>, Vec<Version<String, u8>>)> {
    history_strategy().prop_flat_map(|versions| {
        let original = versions.clone();
        Just(versions)
            .prop_shuffle()
            .prop_map(move |shuffled| (original.clone(), shuffled))
    })
}

proptest! {
    #[test]
    fn init_is_independent_of_input_order((versions, shuffled) in shuffled_history()) {
        let a = Graph::init(versions).unwrap();
        let b = Graph::init(shuffled).unwrap();

        prop_assert_eq!(a.head_revisions(), b.head_revisions());
        prop_assert_eq!(a.len(), b.len());
        for (x, y) in a.versions().zip(b.versions()) {
            prop_assert_eq!(x, y);
        }
        prop_assert_eq!(
            a.merge_branches(["default", "alt"]).unwrap(),
            b.merge_branches(["default", "alt"]).unwrap()
        );
    }

    #[test]
    fn batch_commit_equals_sequential_commits(versions in history_strategy()) {
        let batch = Graph::init(versions.clone()).unwrap();

        let mut sequential = Graph::new();
        for version in versions {
            sequential = sequential.commit(version).unwrap();
        }

        prop_assert_eq!(batch.head_revisions(), sequential.head_revisions());
        for (x, y) in batch.versions().zip(sequential.versions()) {
            prop_assert_eq!(x, y);
        }
    }

    #[test]
    fn merge_is_commutative_and_idempotent(
        versions in history_strategy(),
        a in any::<usize>(),
        b in any::<usize>(),
    ) {
        let graph = Graph::init(versions).unwrap();
        let ra = rev(a % graph.len());
        let rb = rev(b % graph.len());

        let ab = graph.merge_revisions([ra, rb]).unwrap();
        let ba = graph.merge_revisions([rb, ra]).unwrap();
        prop_assert_eq!(&ab, &ba);

        let aa = graph.merge_revisions([ra, ra]).unwrap();
        let single = graph.merge_revisions([ra]).unwrap();
        prop_assert_eq!(aa, single);
    }

    #[test]
    fn ancestors_are_dominated(versions in history_strategy(), pick in any::<usize>()) {
        let graph = Graph::init(versions).unwrap();
        let revision = rev(pick % graph.len());
        let node = graph.version_node(&revision).unwrap();

        let alone = graph.merge_revisions([revision]).unwrap();
        prop_assert_eq!(alone.properties(), &node.properties());

        for ancestor in &graph.ancestors(&revision) {
            let merged = graph.merge_revisions([revision, *ancestor]).unwrap();
            prop_assert_eq!(&merged, &alone);
        }
    }

    #[test]
    fn reset_only_carries_own_writes(versions in history_strategy()) {
        let graph = Graph::init(versions).unwrap();
        for node in graph.versions().filter(|n| n.is_reset()) {
            for key in node.properties().keys() {
                prop_assert!(node.changeset().contains_key(key));
            }
        }
    }

    #[test]
    fn effective_changesets_never_delete_absent_keys(versions in history_strategy()) {
        let graph = Graph::init(versions).unwrap();
        for node in graph.versions() {
            for (key, value) in node.changeset() {
                if value.is_none() {
                    prop_assert!(!node.properties().contains_key(key));
                    prop_assert!(!node.parents().is_empty());
                }
            }
        }
    }
}
