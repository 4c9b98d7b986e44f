//! Version graph for versio.
//!
//! A [`VersionGraph`] is an immutable, append-only DAG of versions indexed by
//! revision and by branch head. Committing returns a new graph value that
//! shares its nodes with the previous one; [`VersionGraph::at`] returns a
//! time-restricted view of the same nodes.
//!
//! # Invariants
//!
//! - Every parent reference resolves to a node inserted before its child.
//! - Revisions are unique within a graph.
//! - Branch heads are always consistent with the committed nodes.

pub mod compact;
pub mod error;
pub mod graph;
pub mod node;

pub use error::{GraphError, GraphResult};
pub use graph::VersionGraph;
pub use node::VersionNode;
