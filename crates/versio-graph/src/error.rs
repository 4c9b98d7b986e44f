//! Error types for the version graph.

use versio_merge::MergeError;
use versio_types::Revision;

/// Errors that can occur during graph operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// The requested revision is not part of the graph.
    #[error("version not found: {0:?}")]
    NotFound(Revision),

    /// A version was committed with a revision that already exists.
    #[error("duplicate revision: {0:?}")]
    DuplicateRevision(Revision),

    /// A parent reference points to a version that is neither committed nor
    /// resolvable within the same batch.
    #[error("invalid parent: version {revision:?} references unknown parent {parent:?}")]
    InvalidParent {
        /// The version containing the bad reference.
        revision: Revision,
        /// The missing parent.
        parent: Revision,
    },

    #[error(transparent)]
    Merge(#[from] MergeError),
}

impl GraphError {
    /// Returns `true` for errors caused by a missing revision.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Merge(MergeError::RevisionNotFound(_))
        )
    }

    /// Returns `true` for errors caused by rejected input versions.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::DuplicateRevision(_) | Self::InvalidParent { .. })
    }
}

/// Convenience alias for graph results.
pub type GraphResult<T> = Result<T, GraphError>;
