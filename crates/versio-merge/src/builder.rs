//! Selection of the revisions to merge.

use std::collections::BTreeSet;

use tracing::debug;

use versio_types::Revision;

use crate::error::{MergeError, MergeResult};
use crate::history::History;
use crate::merge::Merge;
use crate::state::PropertyState;

/// Collects revisions and branch names, then merges them against a history.
///
/// Branches resolve to their current heads when [`build`](Self::build) runs.
/// Revisions that are ancestors of other selected revisions are dropped
/// before merging, so selecting a descendant and its ancestor is the same as
/// selecting the descendant alone.
pub struct MergeBuilder<'h, H: History> {
    history: &'h H,
    revisions: BTreeSet<Revision>,
    branches: BTreeSet<String>,
}

impl<'h, H: History> MergeBuilder<'h, H> {
    pub fn new(history: &'h H) -> Self {
        Self {
            history,
            revisions: BTreeSet::new(),
            branches: BTreeSet::new(),
        }
    }

    pub fn revision(mut self, revision: Revision) -> Self {
        self.revisions.insert(revision);
        self
    }

    pub fn revisions(mut self, revisions: impl IntoIterator<Item = Revision>) -> Self {
        self.revisions.extend(revisions);
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branches.insert(branch.into());
        self
    }

    pub fn branches<I, S>(mut self, branches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.branches.extend(branches.into_iter().map(Into::into));
        self
    }

    /// Merge the selected revisions.
    ///
    /// Fails with [`MergeError::RevisionNotFound`] if an explicit revision is
    /// not part of the history. An empty selection yields an empty merge.
    pub fn build(self) -> MergeResult<Merge<H::Key, H::Value>> {
        let history = self.history;

        let mut selected = self.revisions;
        if let Some(missing) = selected.iter().find(|r| !history.contains(r)) {
            return Err(MergeError::RevisionNotFound(*missing));
        }
        for branch in &self.branches {
            selected.extend(history.branch_heads(branch));
        }

        let heads = minimal_heads(history, &selected);
        if heads.is_empty() {
            return Ok(Merge::empty());
        }

        let states = heads
            .iter()
            .map(|r| history.state(r).ok_or(MergeError::RevisionNotFound(*r)))
            .collect::<MergeResult<Vec<_>>>()?;
        let state = PropertyState::union_all(states, |a, b| history.is_ancestor(a, b));

        let merge = Merge::from_state(heads, &state);
        debug!(
            heads = merge.merge_heads().len(),
            properties = merge.properties().len(),
            conflicts = merge.conflicts().len(),
            "built merge"
        );
        Ok(merge)
    }
}

/// Drop every revision that is an ancestor of another selected revision.
pub fn minimal_heads<H: History>(history: &H, selected: &BTreeSet<Revision>) -> BTreeSet<Revision> {
    selected
        .iter()
        .filter(|r| !selected.iter().any(|other| history.is_ancestor(r, other)))
        .copied()
        .collect()
}
