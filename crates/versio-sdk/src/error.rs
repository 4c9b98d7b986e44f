use thiserror::Error;

#[derive(Debug, Error)]
pub enum VersioError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("graph error: {0}")]
    Graph(#[from] versio_graph::GraphError),

    #[error("store error: {0}")]
    Store(#[from] versio_store::StoreError),

    #[error("cache error: {0}")]
    Cache(#[from] versio_cache::CacheError),

    #[error("path error: {0}")]
    Path(#[from] versio_path::PathError),
}

pub type VersioResult<T> = Result<T, VersioError>;
