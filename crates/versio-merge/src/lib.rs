//! Merge engine for versio.
//!
//! Every version in a history resolves to a [`PropertyState`]: the set of
//! values per key that no later write has superseded. Merging a set of
//! revisions folds their states together and picks a winner per key, while
//! every other concurrent value is reported as a conflict.
//!
//! The engine is independent of how history is stored; it only needs the
//! [`History`] view, which the version graph implements.

pub mod builder;
pub mod error;
pub mod history;
pub mod merge;
pub mod state;

pub use builder::MergeBuilder;
pub use error::{MergeError, MergeResult};
pub use history::History;
pub use merge::Merge;
pub use state::PropertyState;
