use versio_graph::GraphError;
use versio_types::Revision;

/// Errors from version store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The revision is already stored for this document.
    #[error("duplicate revision {0} in document")]
    DuplicateRevision(Revision),

    /// Stored versions do not form a valid graph.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A writer panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Returns `true` for errors caused by the caller's input.
    pub fn is_invalid_argument(&self) -> bool {
        match self {
            StoreError::DuplicateRevision(_) => true,
            StoreError::Graph(err) => err.is_invalid_argument(),
            _ => false,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
