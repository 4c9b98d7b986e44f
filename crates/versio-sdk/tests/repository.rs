use std::sync::Arc;

use serde::{Deserialize, Serialize};

use versio_graph::GraphError;
use versio_sdk::{
    CacheConfig, CompactionConfig, DocumentRepository, InMemoryVersionStore, PropertyPath,
    PropertyValue, VersioConfig, VersioError, VersionStore, DEFAULT_BRANCH,
};

type Store = InMemoryVersionStore<String, PropertyPath, PropertyValue>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Product {
    name: String,
    price: i64,
    tags: Vec<String>,
}

fn lamp(price: i64) -> Product {
    Product {
        name: "Lamp".into(),
        price,
        tags: vec!["home".into()],
    }
}

fn make_repo(config: VersioConfig) -> DocumentRepository<Store> {
    DocumentRepository::new(Arc::new(Store::new()), &config).unwrap()
}

fn doc(name: &str) -> String {
    name.to_string()
}

fn path(s: &str) -> PropertyPath {
    s.parse().unwrap()
}

#[test]
fn objects_round_trip_through_history() {
    let repo = make_repo(VersioConfig::default());
    let id = doc("product");

    repo.commit_object(&id, DEFAULT_BRANCH, &lamp(20)).unwrap().unwrap();
    let loaded: Product = repo.load(&id).unwrap();
    assert_eq!(loaded, lamp(20));

    // Nothing changed, nothing committed.
    assert!(repo.commit_object(&id, DEFAULT_BRANCH, &lamp(20)).unwrap().is_none());

    let update = repo.commit_object(&id, DEFAULT_BRANCH, &lamp(25)).unwrap().unwrap();
    assert_eq!(update.changeset.keys().collect::<Vec<_>>(), vec![&path("price")]);
    assert_eq!(update.parents.len(), 1);

    let loaded: Product = repo.load(&id).unwrap();
    assert_eq!(loaded.price, 25);
    assert_eq!(repo.graph(&id).unwrap().len(), 2);
}

#[test]
fn missing_document_loads_as_none() {
    let repo = make_repo(VersioConfig::default());
    let loaded: Option<Product> = repo.load(&doc("nothing")).unwrap();
    assert!(loaded.is_none());
}

#[test]
fn branches_conflict_until_merged() {
    let repo = make_repo(VersioConfig::default());
    let id = doc("product");
    let base = repo.commit_object(&id, DEFAULT_BRANCH, &lamp(20)).unwrap().unwrap();

    let fork = repo.builder("feature").parent(base.revision).build();
    repo.commit(&id, fork).unwrap();
    repo.commit_object(&id, "feature", &lamp(30)).unwrap().unwrap();
    repo.commit_object(&id, DEFAULT_BRANCH, &lamp(10)).unwrap().unwrap();

    // Each branch on its own is consistent.
    let feature: Product = repo.load_object(&id, ["feature"]).unwrap();
    assert_eq!(feature.price, 30);

    // Together, the newer write wins and the other is reported.
    let merge = repo.merge_branches(&id, [DEFAULT_BRANCH, "feature"]).unwrap();
    assert_eq!(merge.get(&path("price")), Some(&PropertyValue::from(10i64)));
    let conflicts = merge.conflicting_values(&path("price"));
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].value, Some(PropertyValue::from(30i64)));

    // A merge version over both heads resolves it.
    let graph = repo.graph(&id).unwrap();
    let resolved = repo
        .builder(DEFAULT_BRANCH)
        .parents(graph.head_revisions())
        .set(path("price"), 25i64)
        .build();
    repo.commit(&id, resolved).unwrap();

    let merge = repo.merge_branches(&id, [DEFAULT_BRANCH, "feature"]).unwrap();
    assert!(!merge.has_conflicts());
    let merged: Product = repo.load_object(&id, [DEFAULT_BRANCH, "feature"]).unwrap();
    assert_eq!(merged.price, 25);
}

#[test]
fn commit_object_resolves_conflicts_on_its_branch() {
    let repo = make_repo(VersioConfig::default());
    let id = doc("product");
    let base = repo.commit_object(&id, DEFAULT_BRANCH, &lamp(20)).unwrap().unwrap();

    for price in [1i64, 2] {
        let concurrent = repo
            .builder(DEFAULT_BRANCH)
            .parent(base.revision)
            .set(path("price"), price)
            .build();
        repo.commit(&id, concurrent).unwrap();
    }
    let merge = repo.merge_branches(&id, [DEFAULT_BRANCH]).unwrap();
    assert_eq!(merge.merge_heads().len(), 2);
    assert!(merge.has_conflicts());

    // Keeping the winning value still records a version that joins both heads.
    let version = repo.commit_object(&id, DEFAULT_BRANCH, &lamp(2)).unwrap().unwrap();
    assert_eq!(version.parents.len(), 2);
    assert_eq!(
        version.changeset.get(&path("price")),
        Some(&Some(PropertyValue::from(2i64)))
    );

    let merge = repo.merge_branches(&id, [DEFAULT_BRANCH]).unwrap();
    assert!(!merge.has_conflicts());
    assert_eq!(merge.merge_heads().len(), 1);
}

#[test]
fn rejected_versions_are_not_stored() {
    let repo = make_repo(VersioConfig::default());
    let id = doc("product");
    let first = repo.commit_object(&id, DEFAULT_BRANCH, &lamp(1)).unwrap().unwrap();
    let store = repo.cache().store();
    let ordinal = store.last_ordinal().unwrap();

    let err = repo.commit(&id, first.clone()).unwrap_err();
    assert!(matches!(err, VersioError::Graph(GraphError::DuplicateRevision(r)) if r == first.revision));

    let orphan = repo
        .builder(DEFAULT_BRANCH)
        .parent(repo.clock().next())
        .set(path("name"), "Orphan")
        .build();
    let err = repo.commit(&id, orphan).unwrap_err();
    assert!(matches!(err, VersioError::Graph(GraphError::InvalidParent { .. })));

    assert_eq!(store.last_ordinal().unwrap(), ordinal);
    assert_eq!(store.load(&id).unwrap().len(), 1);
}

#[test]
fn configured_compaction_bounds_cached_history() {
    let config = VersioConfig {
        cache: CacheConfig {
            max_entries: None,
            compaction: Some(CompactionConfig {
                keep_newest: 1,
                trigger_size: 3,
            }),
        },
        ..VersioConfig::default()
    };
    let repo = make_repo(config);
    let id = doc("product");

    for price in 1..=6 {
        repo.commit_object(&id, DEFAULT_BRANCH, &lamp(price)).unwrap().unwrap();
    }

    assert!(repo.graph(&id).unwrap().len() <= 3);
    assert_eq!(repo.cache().store().load(&id).unwrap().len(), 6);
    let loaded: Product = repo.load(&id).unwrap();
    assert_eq!(loaded, lamp(6));
}

#[test]
fn revisions_carry_the_configured_writer() {
    let repo = make_repo(VersioConfig {
        writer_id: 7,
        ..VersioConfig::default()
    });
    let a = repo.builder(DEFAULT_BRANCH).build();
    let b = repo.builder("other").build();

    assert_eq!(a.revision.writer(), 7);
    assert!(b.revision > a.revision);
    assert_eq!(b.branch, "other");
}

#[test]
fn max_entries_bounds_cached_documents() {
    let repo = make_repo(VersioConfig {
        cache: CacheConfig {
            max_entries: Some(1),
            compaction: None,
        },
        ..VersioConfig::default()
    });
    repo.commit_object(&doc("a"), DEFAULT_BRANCH, &lamp(1)).unwrap();
    repo.commit_object(&doc("b"), DEFAULT_BRANCH, &lamp(2)).unwrap();

    assert_eq!(repo.cache().len().unwrap(), 1);
    let a: Product = repo.load(&doc("a")).unwrap();
    assert_eq!(a.price, 1);
}

#[test]
fn zero_max_entries_is_rejected() {
    let config = VersioConfig {
        cache: CacheConfig {
            max_entries: Some(0),
            compaction: None,
        },
        ..VersioConfig::default()
    };
    let result = DocumentRepository::new(Arc::new(Store::new()), &config);
    assert!(matches!(result, Err(VersioError::Cache(_))));
}

#[test]
fn commit_accepts_parent_compacted_out_of_the_cache() {
    let repo = make_repo(VersioConfig {
        cache: CacheConfig {
            max_entries: None,
            compaction: Some(CompactionConfig {
                keep_newest: 0,
                trigger_size: 2,
            }),
        },
        ..VersioConfig::default()
    });
    let id = doc("product");
    let first = repo.commit_object(&id, DEFAULT_BRANCH, &lamp(1)).unwrap().unwrap();
    for price in 2..=3 {
        repo.commit_object(&id, DEFAULT_BRANCH, &lamp(price)).unwrap().unwrap();
    }
    assert!(!repo.graph(&id).unwrap().contains(&first.revision));

    let fork = repo
        .builder("alt")
        .parent(first.revision)
        .set(path("name"), "Fork")
        .build();
    repo.commit(&id, fork).unwrap();

    let alt: Product = repo.load_object(&id, ["alt"]).unwrap();
    assert_eq!(alt.name, "Fork");
    assert_eq!(alt.price, 1);
    let main: Product = repo.load(&id).unwrap();
    assert_eq!(main, lamp(3));
}
