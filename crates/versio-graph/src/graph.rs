//! The version graph and its queries.
//!
//! [`VersionGraph`] stores nodes in a [`SharedMap`] keyed by revision, so
//! iteration is always in ascending revision order, plus a branch → heads
//! index. Graph values are cheap to clone and to extend: committing a version
//! copies only the index path to its revision, and nodes themselves are
//! shared between successive graphs.
//!
//! # Ancestry
//!
//! Nodes do not store their ancestor sets. Ancestry queries walk parent
//! edges, skipping every node whose generation is not above the ancestor
//! sought.
//!
//! # Heads
//!
//! A node is a head of its branch when no node *on the same branch* names it
//! as a parent, and no reset version descends from it. Merging a branch into
//! another therefore does not end the source branch, while a reset closes
//! every line of history it builds on.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use versio_merge::{History, Merge, MergeBuilder, PropertyState};
use versio_types::{Revision, SharedMap, Version, VersionType};

use crate::error::{GraphError, GraphResult};
use crate::node::VersionNode;

pub(crate) type NodeMap<K, V, M> = SharedMap<Revision, Arc<VersionNode<K, V, M>>>;

#[derive(Debug)]
pub(crate) struct GraphInner<K, V, M> {
    pub(crate) nodes: NodeMap<K, V, M>,
    pub(crate) heads: BTreeMap<String, BTreeSet<Revision>>,
}

impl<K, V, M> Default for GraphInner<K, V, M> {
    fn default() -> Self {
        Self {
            nodes: SharedMap::new(),
            heads: BTreeMap::new(),
        }
    }
}

impl<K, V, M> Clone for GraphInner<K, V, M> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            heads: self.heads.clone(),
        }
    }
}

/// An immutable, append-only graph of versions.
///
/// A graph is either *at tip* (it holds every committed version) or a view
/// returned by [`at`](Self::at), restricted to the causal history of one
/// revision. Views remember their tip graph, so views can be chained and
/// [`at_tip`](Self::at_tip) always gets back to the full history.
#[derive(Debug)]
pub struct VersionGraph<K, V, M = ()> {
    inner: Arc<GraphInner<K, V, M>>,
    tip_graph: Option<Arc<GraphInner<K, V, M>>>,
}

impl<K, V, M> Clone for VersionGraph<K, V, M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            tip_graph: self.tip_graph.clone(),
        }
    }
}

impl<K, V, M> Default for VersionGraph<K, V, M> {
    fn default() -> Self {
        Self {
            inner: Arc::new(GraphInner::default()),
            tip_graph: None,
        }
    }
}

impl<K: Ord + Clone, V: Clone + PartialEq, M> VersionGraph<K, V, M> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from versions supplied in any order.
    ///
    /// Versions are inserted in ascending revision order, except that a
    /// parent is always inserted before its children, so the result does not
    /// depend on the input order.
    pub fn init<I>(versions: I) -> GraphResult<Self>
    where
        I: IntoIterator<Item = Version<K, V, M>>,
    {
        Self::new().commit_all(versions)
    }

    pub(crate) fn from_inner(inner: GraphInner<K, V, M>) -> Self {
        Self {
            inner: Arc::new(inner),
            tip_graph: None,
        }
    }

    /// Total number of versions in this graph.
    pub fn len(&self) -> usize {
        self.inner.nodes.len()
    }

    /// Returns `true` if the graph has no versions.
    pub fn is_empty(&self) -> bool {
        self.inner.nodes.is_empty()
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Commit a single version. See [`commit_all`](Self::commit_all).
    pub fn commit(&self, version: Version<K, V, M>) -> GraphResult<Self> {
        self.commit_all(std::iter::once(version))
    }

    /// Commit a batch of versions, returning a new graph.
    ///
    /// The batch is atomic: if any version is rejected, no version is added.
    /// Parents may refer to the prior graph or to other versions of the same
    /// batch. Committing to a view commits to its tip graph.
    ///
    /// Fails with [`GraphError::DuplicateRevision`] if a revision is already
    /// committed or appears twice in the batch, and with
    /// [`GraphError::InvalidParent`] if a parent cannot be resolved.
    pub fn commit_all<I>(&self, versions: I) -> GraphResult<Self>
    where
        I: IntoIterator<Item = Version<K, V, M>>,
    {
        let base = self.tip_inner();

        let mut pending: BTreeMap<Revision, Version<K, V, M>> = BTreeMap::new();
        for version in versions {
            let revision = version.revision;
            if base.nodes.contains_key(&revision) || pending.contains_key(&revision) {
                return Err(GraphError::DuplicateRevision(revision));
            }
            pending.insert(revision, version);
        }
        if pending.is_empty() {
            return Ok(self.at_tip());
        }

        let order = insertion_order(&base.nodes, &pending)?;
        let count = order.len();

        let mut inner = GraphInner::clone(base);
        for revision in order {
            if let Some(version) = pending.remove(&revision) {
                insert_node(&mut inner, version)?;
            }
        }

        debug!(count, total = inner.nodes.len(), "committed versions");
        Ok(Self::from_inner(inner))
    }

    // ---------------------------------------------------------------
    // Views
    // ---------------------------------------------------------------

    /// The graph as it was when `revision` was committed: the revision and
    /// its transitive ancestors, with heads recomputed for that cut.
    ///
    /// Resolved against the tip graph, so `graph.at(a).at(b)` is the same as
    /// `graph.at(b)`. Fails with [`GraphError::NotFound`] if the revision is
    /// not committed.
    pub fn at(&self, revision: Revision) -> GraphResult<Self> {
        let tip = self.tip_inner();
        let node = tip
            .nodes
            .get(&revision)
            .ok_or(GraphError::NotFound(revision))?;

        let mut keep = ancestors_in(&tip.nodes, [node.revision()]);
        keep.insert(revision);
        Ok(self.restrict(keep))
    }

    /// The graph as it was when `revision` was the newest version: every
    /// version with a revision up to and including it, plus their ancestors.
    ///
    /// Unlike [`at`](Self::at), concurrent lines of history committed before
    /// `revision` stay visible. Fails with [`GraphError::NotFound`] if the
    /// revision is not committed.
    pub fn as_of(&self, revision: Revision) -> GraphResult<Self> {
        let tip = self.tip_inner();
        if !tip.nodes.contains_key(&revision) {
            return Err(GraphError::NotFound(revision));
        }

        let visible: Vec<Revision> = tip
            .nodes
            .keys()
            .take_while(|r| **r <= revision)
            .copied()
            .collect();
        let mut keep = ancestors_in(&tip.nodes, visible.iter().copied());
        keep.extend(visible);
        Ok(self.restrict(keep))
    }

    /// View of the tip graph holding only `keep`, which must be closed under
    /// ancestry.
    fn restrict(&self, keep: BTreeSet<Revision>) -> Self {
        let tip = self.tip_inner();
        if keep.len() == tip.nodes.len() {
            return self.at_tip();
        }

        let nodes: NodeMap<K, V, M> = tip
            .nodes
            .iter()
            .filter(|(r, _)| keep.contains(*r))
            .map(|(r, n)| (*r, Arc::clone(n)))
            .collect();
        let heads = compute_heads(&nodes);

        Self {
            inner: Arc::new(GraphInner { nodes, heads }),
            tip_graph: Some(Arc::clone(tip)),
        }
    }

    /// The full, most current graph. Returns the same value when already at
    /// tip.
    pub fn at_tip(&self) -> Self {
        match &self.tip_graph {
            None => self.clone(),
            Some(tip) => Self {
                inner: Arc::clone(tip),
                tip_graph: None,
            },
        }
    }

    /// Returns `true` unless this graph is a view created by [`at`](Self::at).
    pub fn is_at_tip(&self) -> bool {
        self.tip_graph.is_none()
    }

    /// Returns `true` if both graph values share the same node index.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn tip_inner(&self) -> &Arc<GraphInner<K, V, M>> {
        self.tip_graph.as_ref().unwrap_or(&self.inner)
    }

    // ---------------------------------------------------------------
    // Lookups
    // ---------------------------------------------------------------

    /// Retrieve a node, failing with [`GraphError::NotFound`] if absent.
    pub fn version_node(&self, revision: &Revision) -> GraphResult<&VersionNode<K, V, M>> {
        self.get(revision).ok_or(GraphError::NotFound(*revision))
    }

    pub fn get(&self, revision: &Revision) -> Option<&VersionNode<K, V, M>> {
        self.inner.nodes.get(revision).map(Arc::as_ref)
    }

    pub fn contains(&self, revision: &Revision) -> bool {
        self.inner.nodes.contains_key(revision)
    }

    /// Returns `true` if every given revision is in the graph. Vacuously true
    /// for an empty input.
    pub fn contains_all<I>(&self, revisions: I) -> bool
    where
        I: IntoIterator<Item = Revision>,
    {
        revisions.into_iter().all(|r| self.contains(&r))
    }

    /// All nodes in ascending revision order.
    pub fn versions(&self) -> impl DoubleEndedIterator<Item = &VersionNode<K, V, M>> {
        self.inner.nodes.values().map(Arc::as_ref)
    }

    /// The node with the greatest revision, if any.
    pub fn tip(&self) -> Option<&VersionNode<K, V, M>> {
        self.inner.nodes.last().map(|(_, n)| n.as_ref())
    }

    /// All nodes with every parent listed before its children.
    ///
    /// A node's generation is greater than any of its parents', so ordering
    /// by generation (then revision) is a topological order.
    pub fn topological_order(&self) -> Vec<&VersionNode<K, V, M>> {
        let mut nodes: Vec<_> = self.versions().collect();
        nodes.sort_by_key(|n| (n.generation, n.revision()));
        nodes
    }

    /// Returns `true` if `ancestor` is a strict transitive ancestor of
    /// `descendant`.
    pub fn is_ancestor(&self, ancestor: &Revision, descendant: &Revision) -> bool {
        is_ancestor_in(&self.inner.nodes, ancestor, descendant)
    }

    /// All strict transitive ancestors of `revision`; empty if unknown.
    pub fn ancestors(&self, revision: &Revision) -> BTreeSet<Revision> {
        ancestors_in(&self.inner.nodes, [*revision])
    }

    /// Strict ancestors of any of `revisions`.
    pub(crate) fn ancestors_of_all<I>(&self, revisions: I) -> BTreeSet<Revision>
    where
        I: IntoIterator<Item = Revision>,
    {
        ancestors_in(&self.inner.nodes, revisions)
    }

    /// The nearest common ancestors of two revisions.
    ///
    /// Ancestor sets include the revisions themselves, so an ancestor of the
    /// other revision is its own nearest common ancestor. Returns an empty set
    /// if either revision is unknown or the histories are disjoint.
    pub fn nearest_common_ancestors(&self, a: &Revision, b: &Revision) -> BTreeSet<Revision> {
        if !self.contains(a) || !self.contains(b) {
            return BTreeSet::new();
        }

        let mut of_a = self.ancestors(a);
        of_a.insert(*a);
        let mut of_b = self.ancestors(b);
        of_b.insert(*b);
        let common: BTreeSet<Revision> = of_a.intersection(&of_b).copied().collect();

        let dominated = self.ancestors_of_all(common.iter().copied());
        common.difference(&dominated).copied().collect()
    }

    // ---------------------------------------------------------------
    // Heads & branches
    // ---------------------------------------------------------------

    /// Every branch that has at least one version in this graph.
    pub fn branches(&self) -> impl Iterator<Item = &str> {
        self.inner.heads.keys().map(String::as_str)
    }

    /// Heads of every branch.
    pub fn head_revisions(&self) -> BTreeSet<Revision> {
        self.inner.heads.values().flatten().copied().collect()
    }

    /// Heads of one branch; empty for an unknown branch.
    pub fn branch_head_revisions(&self, branch: &str) -> BTreeSet<Revision> {
        self.inner.heads.get(branch).cloned().unwrap_or_default()
    }

    /// All heads as `(branch, node)` pairs.
    pub fn heads(&self) -> impl Iterator<Item = (&str, &VersionNode<K, V, M>)> {
        self.inner.heads.iter().flat_map(move |(branch, revisions)| {
            revisions
                .iter()
                .filter_map(move |r| self.get(r).map(|node| (branch.as_str(), node)))
        })
    }

    /// The latest head of a branch.
    pub fn head(&self, branch: &str) -> Option<&VersionNode<K, V, M>> {
        self.inner
            .heads
            .get(branch)
            .and_then(|heads| heads.last())
            .and_then(|r| self.get(r))
    }

    // ---------------------------------------------------------------
    // Merges
    // ---------------------------------------------------------------

    /// Start a merge over this graph.
    pub fn merge_builder(&self) -> MergeBuilder<'_, Self> {
        MergeBuilder::new(self)
    }

    /// Merge explicit revisions.
    pub fn merge_revisions<I>(&self, revisions: I) -> GraphResult<Merge<K, V>>
    where
        I: IntoIterator<Item = Revision>,
    {
        Ok(self.merge_builder().revisions(revisions).build()?)
    }

    /// Merge the current heads of the given branches.
    pub fn merge_branches<I, S>(&self, branches: I) -> GraphResult<Merge<K, V>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(self.merge_builder().branches(branches).build()?)
    }
}

impl<K: Ord + Clone, V: Clone + PartialEq, M> History for VersionGraph<K, V, M> {
    type Key = K;
    type Value = V;

    fn contains(&self, revision: &Revision) -> bool {
        VersionGraph::contains(self, revision)
    }

    fn is_ancestor(&self, ancestor: &Revision, descendant: &Revision) -> bool {
        VersionGraph::is_ancestor(self, ancestor, descendant)
    }

    fn state(&self, revision: &Revision) -> Option<&PropertyState<K, V>> {
        self.get(revision).map(VersionNode::state)
    }

    fn branch_heads(&self, branch: &str) -> BTreeSet<Revision> {
        self.branch_head_revisions(branch)
    }
}

// ---------------------------------------------------------------
// Construction helpers
// ---------------------------------------------------------------

/// Order a batch so that parents come first, preferring lower revisions.
///
/// Uses Kahn's algorithm over the parent edges internal to the batch. Parents
/// outside the batch must already exist; a batch member whose parents only
/// resolve through a cycle is reported as [`GraphError::InvalidParent`].
fn insertion_order<K, V, M>(
    existing: &NodeMap<K, V, M>,
    pending: &BTreeMap<Revision, Version<K, V, M>>,
) -> GraphResult<Vec<Revision>> {
    let mut unresolved: BTreeMap<Revision, usize> = BTreeMap::new();
    let mut children: BTreeMap<Revision, Vec<Revision>> = BTreeMap::new();
    let mut ready: BTreeSet<Revision> = BTreeSet::new();

    for (revision, version) in pending {
        let mut count = 0;
        for parent in &version.parents {
            if pending.contains_key(parent) {
                count += 1;
                children.entry(*parent).or_default().push(*revision);
            } else if !existing.contains_key(parent) {
                return Err(GraphError::InvalidParent {
                    revision: *revision,
                    parent: *parent,
                });
            }
        }
        if count == 0 {
            ready.insert(*revision);
        } else {
            unresolved.insert(*revision, count);
        }
    }

    let mut order = Vec::with_capacity(pending.len());
    while let Some(revision) = ready.pop_first() {
        order.push(revision);
        for child in children.get(&revision).into_iter().flatten() {
            if let Some(count) = unresolved.get_mut(child) {
                *count -= 1;
                if *count == 0 {
                    unresolved.remove(child);
                    ready.insert(*child);
                }
            }
        }
    }

    if let Some((revision, _)) = unresolved.first_key_value() {
        let parent = pending[revision]
            .parents
            .iter()
            .find(|p| unresolved.contains_key(*p))
            .copied()
            .unwrap_or(*revision);
        return Err(GraphError::InvalidParent {
            revision: *revision,
            parent,
        });
    }

    Ok(order)
}

/// Returns `true` if `ancestor` is reachable from `descendant` over parent
/// edges. Nodes at or below the ancestor's generation are not expanded.
pub(crate) fn is_ancestor_in<K, V, M>(
    nodes: &NodeMap<K, V, M>,
    ancestor: &Revision,
    descendant: &Revision,
) -> bool {
    let (Some(target), Some(start)) = (nodes.get(ancestor), nodes.get(descendant)) else {
        return false;
    };
    if target.generation >= start.generation {
        return false;
    }

    let mut seen = BTreeSet::new();
    let mut stack: Vec<Revision> = start.version.parents.iter().copied().collect();
    while let Some(revision) = stack.pop() {
        if revision == *ancestor {
            return true;
        }
        if !seen.insert(revision) {
            continue;
        }
        if let Some(node) = nodes.get(&revision) {
            if node.generation > target.generation {
                stack.extend(node.version.parents.iter().copied());
            }
        }
    }
    false
}

/// Strict ancestors of any of `starts`. A start is included only when it is
/// an ancestor of another start.
pub(crate) fn ancestors_in<K, V, M, I>(nodes: &NodeMap<K, V, M>, starts: I) -> BTreeSet<Revision>
where
    I: IntoIterator<Item = Revision>,
{
    let mut stack: Vec<Revision> = starts
        .into_iter()
        .filter_map(|r| nodes.get(&r))
        .flat_map(|n| n.version.parents.iter().copied())
        .collect();
    let mut ancestors = BTreeSet::new();
    while let Some(revision) = stack.pop() {
        if ancestors.insert(revision) {
            if let Some(node) = nodes.get(&revision) {
                stack.extend(node.version.parents.iter().copied());
            }
        }
    }
    ancestors
}

/// Generation and merged state of a set of parents.
///
/// A reset version starts from an empty state.
pub(crate) fn parent_state<K, V, M>(
    nodes: &NodeMap<K, V, M>,
    revision: Revision,
    parents: &BTreeSet<Revision>,
    reset: bool,
) -> GraphResult<(u64, PropertyState<K, V>)>
where
    K: Ord + Clone,
    V: Clone + PartialEq,
{
    let mut generation = 0;
    let mut states = Vec::with_capacity(parents.len());
    for parent in parents {
        let node = nodes.get(parent).ok_or(GraphError::InvalidParent {
            revision,
            parent: *parent,
        })?;
        generation = generation.max(node.generation + 1);
        states.push(node.state.as_ref());
    }

    let state = if reset {
        PropertyState::new()
    } else {
        PropertyState::union_all(states, |a, b| is_ancestor_in(nodes, a, b))
    };
    Ok((generation, state))
}

/// Insert a version whose parents are all present, updating the head index.
pub(crate) fn insert_node<K, V, M>(
    inner: &mut GraphInner<K, V, M>,
    version: Version<K, V, M>,
) -> GraphResult<()>
where
    K: Ord + Clone,
    V: Clone + PartialEq,
{
    let (generation, mut state) = parent_state(
        &inner.nodes,
        version.revision,
        &version.parents,
        version.is_reset(),
    )?;

    let Version {
        revision,
        branch,
        parents,
        kind,
        changeset,
        meta,
    } = version;
    let changeset = state.reduce(changeset);
    state.apply(revision, &changeset);

    let heads = inner.heads.entry(branch.clone()).or_default();
    for parent in &parents {
        if inner
            .nodes
            .get(parent)
            .is_some_and(|p| p.version.branch == branch)
        {
            heads.remove(parent);
        }
    }
    heads.insert(revision);
    if kind == VersionType::Reset {
        let mut ancestors = ancestors_in(&inner.nodes, parents.iter().copied());
        ancestors.extend(parents.iter().copied());
        for heads in inner.heads.values_mut() {
            heads.retain(|r| !ancestors.contains(r));
        }
    }

    debug!(
        revision = %revision.short_hex(),
        branch = %branch,
        changes = changeset.len(),
        "added version node"
    );

    let node = VersionNode {
        version: Version {
            revision,
            branch,
            parents,
            kind,
            changeset,
            meta,
        },
        generation,
        state: Arc::new(state),
    };
    inner.nodes.insert(revision, Arc::new(node));
    Ok(())
}

/// Recompute the head index of a node set from scratch.
pub(crate) fn compute_heads<K, V, M>(
    nodes: &NodeMap<K, V, M>,
) -> BTreeMap<String, BTreeSet<Revision>> {
    let mut heads: BTreeMap<String, BTreeSet<Revision>> = BTreeMap::new();
    let mut closed: BTreeSet<Revision> = BTreeSet::new();

    let mut resets = Vec::new();
    for (revision, node) in nodes {
        let branch = &node.version.branch;
        heads.entry(branch.clone()).or_default().insert(*revision);
        for parent in &node.version.parents {
            if nodes
                .get(parent)
                .is_some_and(|p| &p.version.branch == branch)
            {
                closed.insert(*parent);
            }
        }
        if node.version.is_reset() {
            resets.push(*revision);
        }
    }
    closed.extend(ancestors_in(nodes, resets));

    for revisions in heads.values_mut() {
        revisions.retain(|r| !closed.contains(r));
    }
    heads
}
