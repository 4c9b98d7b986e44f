//! Compaction policies for cached graphs.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use versio_graph::{GraphResult, VersionGraph, VersionNode};
use versio_types::Revision;

use crate::error::{CacheError, CacheResult};

/// Decides whether a version survives compaction.
pub type RetainFn<K, V, M> =
    Arc<dyn Fn(&VersionGraph<K, V, M>, &VersionNode<K, V, M>) -> bool + Send + Sync>;

/// Decides whether a graph is due for compaction.
pub type TriggerFn<K, V, M> = Arc<dyn Fn(&VersionGraph<K, V, M>) -> bool + Send + Sync>;

/// Which versions survive compaction.
enum Retain<K, V, M> {
    /// A predicate asked once per version.
    Each(RetainFn<K, V, M>),
    /// The given number of newest non-head versions, selected once per
    /// compaction.
    Newest(usize),
}

impl<K, V, M> Clone for Retain<K, V, M> {
    fn clone(&self) -> Self {
        match self {
            Retain::Each(retain) => Retain::Each(Arc::clone(retain)),
            Retain::Newest(count) => Retain::Newest(*count),
        }
    }
}

/// When and how a cache compacts the graphs it holds.
///
/// Heads, the merge bases between retained versions, and the writers of
/// conflicting values are always kept regardless of the retain predicate.
pub struct GraphOptions<K, V, M = ()> {
    retain: Retain<K, V, M>,
    trigger: TriggerFn<K, V, M>,
}

impl<K, V, M> Clone for GraphOptions<K, V, M> {
    fn clone(&self) -> Self {
        Self {
            retain: self.retain.clone(),
            trigger: Arc::clone(&self.trigger),
        }
    }
}

impl<K, V, M> fmt::Debug for GraphOptions<K, V, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("GraphOptions");
        if let Retain::Newest(count) = self.retain {
            s.field("keep_newest", &count);
        }
        s.finish_non_exhaustive()
    }
}

impl<K, V, M> GraphOptions<K, V, M>
where
    K: Ord + Clone + 'static,
    V: Clone + PartialEq + 'static,
    M: Clone + 'static,
{
    pub fn builder() -> GraphOptionsBuilder<K, V, M> {
        GraphOptionsBuilder::default()
    }

    /// Never compact.
    pub fn keep_all() -> Self {
        Self {
            retain: Retain::Each(Arc::new(
                |_: &VersionGraph<K, V, M>, _: &VersionNode<K, V, M>| true,
            )),
            trigger: Arc::new(|_: &VersionGraph<K, V, M>| false),
        }
    }

    /// Once a graph holds more than `trigger_size` versions, keep only the
    /// heads and the `count` newest other versions.
    pub fn keep_heads_and_newest(count: usize, trigger_size: usize) -> Self {
        Self {
            retain: Retain::Newest(count),
            trigger: Arc::new(move |graph: &VersionGraph<K, V, M>| graph.len() > trigger_size),
        }
    }

    pub fn should_compact(&self, graph: &VersionGraph<K, V, M>) -> bool {
        (self.trigger)(graph)
    }

    /// Compact `graph` if the trigger fires, otherwise return it as is.
    pub fn apply(&self, graph: VersionGraph<K, V, M>) -> GraphResult<VersionGraph<K, V, M>> {
        if !self.should_compact(&graph) {
            return Ok(graph);
        }
        match &self.retain {
            Retain::Each(retain) => graph.compact(|node| retain(&graph, node)),
            Retain::Newest(count) => {
                let keep = newest_non_heads(&graph, *count);
                graph.compact(|node| keep.contains(&node.revision()))
            }
        }
    }
}

/// The `count` greatest revisions that are not branch heads.
fn newest_non_heads<K, V, M>(graph: &VersionGraph<K, V, M>, count: usize) -> BTreeSet<Revision>
where
    K: Ord + Clone,
    V: Clone + PartialEq,
{
    let heads = graph.head_revisions();
    graph
        .versions()
        .rev()
        .map(VersionNode::revision)
        .filter(|r| !heads.contains(r))
        .take(count)
        .collect()
}

impl<K, V, M> Default for GraphOptions<K, V, M>
where
    K: Ord + Clone + 'static,
    V: Clone + PartialEq + 'static,
    M: Clone + 'static,
{
    fn default() -> Self {
        Self::keep_all()
    }
}

/// Builder for custom [`GraphOptions`]. Both predicates are required.
pub struct GraphOptionsBuilder<K, V, M = ()> {
    retain: Option<RetainFn<K, V, M>>,
    trigger: Option<TriggerFn<K, V, M>>,
}

impl<K, V, M> Default for GraphOptionsBuilder<K, V, M> {
    fn default() -> Self {
        Self {
            retain: None,
            trigger: None,
        }
    }
}

impl<K, V, M> GraphOptionsBuilder<K, V, M> {
    pub fn retain<F>(mut self, retain: F) -> Self
    where
        F: Fn(&VersionGraph<K, V, M>, &VersionNode<K, V, M>) -> bool + Send + Sync + 'static,
    {
        self.retain = Some(Arc::new(retain));
        self
    }

    pub fn trigger<F>(mut self, trigger: F) -> Self
    where
        F: Fn(&VersionGraph<K, V, M>) -> bool + Send + Sync + 'static,
    {
        self.trigger = Some(Arc::new(trigger));
        self
    }

    pub fn build(self) -> CacheResult<GraphOptions<K, V, M>> {
        let retain = self
            .retain
            .ok_or_else(|| CacheError::InvalidArgument("retain predicate is required".into()))?;
        let trigger = self
            .trigger
            .ok_or_else(|| CacheError::InvalidArgument("trigger predicate is required".into()))?;
        Ok(GraphOptions {
            retain: Retain::Each(retain),
            trigger,
        })
    }
}
