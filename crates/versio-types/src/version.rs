//! Immutable version records.
//!
//! A [`Version`] is the unit of history: it names its branch and parent
//! revisions and carries a partial [`Changeset`]. Versions are plain values;
//! parent references are only checked when a version is committed into a
//! graph.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::revision::Revision;

/// Branch used when a version does not name one.
pub const DEFAULT_BRANCH: &str = "default";

/// Partial key/value delta. A `None` value marks a deletion.
pub type Changeset<K, V> = BTreeMap<K, Option<V>>;

/// How a version relates to the state accumulated by its history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionType {
    /// Applies the changeset on top of the merged parent state.
    #[default]
    Normal,
    /// Discards the merged parent state and starts from the changeset alone.
    Reset,
}

impl fmt::Display for VersionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "NORMAL"),
            Self::Reset => write!(f, "RESET"),
        }
    }
}

/// An immutable commit record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "K: Serialize, V: Serialize, M: Serialize",
    deserialize = "K: Ord + Deserialize<'de>, V: Deserialize<'de>, M: Deserialize<'de>"
))]
pub struct Version<K, V, M = ()> {
    /// Unique identifier within any one graph.
    pub revision: Revision,
    /// Named line of history this version extends.
    pub branch: String,
    /// Parent revisions: empty for a root, several for a merge.
    pub parents: BTreeSet<Revision>,
    /// Normal or reset.
    pub kind: VersionType,
    /// Keys changed by this version.
    pub changeset: Changeset<K, V>,
    /// Opaque caller payload.
    pub meta: M,
}

impl<K: Ord, V> Version<K, V> {
    /// Start building a version with the given revision.
    pub fn builder(revision: Revision) -> VersionBuilder<K, V> {
        VersionBuilder::new(revision)
    }
}

impl<K, V, M> Version<K, V, M> {
    /// Returns `true` if this version has no parents.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Returns `true` if this version joins two or more lines of history.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Returns `true` if this version is of type [`VersionType::Reset`].
    pub fn is_reset(&self) -> bool {
        self.kind == VersionType::Reset
    }

    /// Returns a human-readable summary of this version.
    pub fn summary(&self) -> String {
        format!(
            "{} {} on {} ({} parents, {} changes)",
            self.kind,
            self.revision.short_hex(),
            self.branch,
            self.parents.len(),
            self.changeset.len(),
        )
    }
}

/// Fluent constructor for [`Version`].
#[derive(Clone, Debug)]
pub struct VersionBuilder<K, V, M = ()> {
    revision: Revision,
    branch: Option<String>,
    parents: BTreeSet<Revision>,
    kind: VersionType,
    changeset: Changeset<K, V>,
    meta: M,
}

impl<K: Ord, V> VersionBuilder<K, V> {
    /// Create a builder for a root version on the default branch.
    pub fn new(revision: Revision) -> Self {
        Self {
            revision,
            branch: None,
            parents: BTreeSet::new(),
            kind: VersionType::Normal,
            changeset: BTreeMap::new(),
            meta: (),
        }
    }
}

impl<K: Ord, V, M> VersionBuilder<K, V, M> {
    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn parent(mut self, parent: Revision) -> Self {
        self.parents.insert(parent);
        self
    }

    pub fn parents(mut self, parents: impl IntoIterator<Item = Revision>) -> Self {
        self.parents.extend(parents);
        self
    }

    pub fn kind(mut self, kind: VersionType) -> Self {
        self.kind = kind;
        self
    }

    /// Shorthand for `kind(VersionType::Reset)`.
    pub fn reset(self) -> Self {
        self.kind(VersionType::Reset)
    }

    /// Assign `value` to `key`.
    pub fn set(mut self, key: impl Into<K>, value: impl Into<V>) -> Self {
        self.changeset.insert(key.into(), Some(value.into()));
        self
    }

    /// Delete `key`.
    pub fn remove(mut self, key: impl Into<K>) -> Self {
        self.changeset.insert(key.into(), None);
        self
    }

    /// Record a raw change; `None` deletes.
    pub fn change(mut self, key: K, value: Option<V>) -> Self {
        self.changeset.insert(key, value);
        self
    }

    /// Extend the changeset with raw changes.
    pub fn changeset(mut self, changes: impl IntoIterator<Item = (K, Option<V>)>) -> Self {
        self.changeset.extend(changes);
        self
    }

    /// Replace the metadata payload, possibly changing its type.
    pub fn meta<N>(self, meta: N) -> VersionBuilder<K, V, N> {
        VersionBuilder {
            revision: self.revision,
            branch: self.branch,
            parents: self.parents,
            kind: self.kind,
            changeset: self.changeset,
            meta,
        }
    }

    pub fn build(self) -> Version<K, V, M> {
        Version {
            revision: self.revision,
            branch: self
                .branch
                .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            parents: self.parents,
            kind: self.kind,
            changeset: self.changeset,
            meta: self.meta,
        }
    }
}
