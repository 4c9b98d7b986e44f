use versio_graph::GraphError;
use versio_store::StoreError;

/// Errors from cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A cache or policy setting is missing or out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Fetching from the store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Fetched versions do not form a valid graph.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A thread panicked while holding the cache lock.
    #[error("cache lock poisoned")]
    Poisoned,
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
