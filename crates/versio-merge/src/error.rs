//! Error types for merge operations.

use versio_types::Revision;

/// Errors that can occur while building a merge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// A selected revision is not part of the history being merged.
    #[error("revision not found: {0:?}")]
    RevisionNotFound(Revision),
}

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
