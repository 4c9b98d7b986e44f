//! Error types for the path crate.

/// Errors that can occur while parsing paths or mapping objects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// A path string could not be parsed.
    #[error("invalid property path {input:?} at offset {offset}: {reason}")]
    Parse {
        input: String,
        offset: usize,
        reason: &'static str,
    },

    /// Serialization or deserialization of an object failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A property does not fit the shape of its parent.
    #[error("conflicting shape at {path}: {reason}")]
    Conflict { path: String, reason: &'static str },
}

impl From<serde_json::Error> for PathError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience alias for path results.
pub type PathResult<T> = Result<T, PathError>;
