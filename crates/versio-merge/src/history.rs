use std::collections::BTreeSet;

use versio_types::Revision;

use crate::state::PropertyState;

/// Read access to a committed history, as needed by the merge engine.
pub trait History {
    type Key: Ord + Clone;
    type Value: Clone + PartialEq;

    /// Returns `true` if the revision is part of this history.
    fn contains(&self, revision: &Revision) -> bool;

    /// Returns `true` if `ancestor` is a strict transitive ancestor of `descendant`.
    fn is_ancestor(&self, ancestor: &Revision, descendant: &Revision) -> bool;

    /// The resolved state of the given revision, including its own changes.
    fn state(&self, revision: &Revision) -> Option<&PropertyState<Self::Key, Self::Value>>;

    /// Current heads of a branch. Unknown branches have no heads.
    fn branch_heads(&self, branch: &str) -> BTreeSet<Revision>;
}
