//! High-level SDK for versio.
//!
//! Provides [`DocumentRepository`], which stores any `serde` value as a
//! versioned document: objects are flattened into property paths, committed
//! as versions on named branches, merged across branches, and rebuilt.
//! This is the main entry point for applications embedding versio.

pub mod config;
pub mod error;
pub mod logging;
pub mod repository;

pub use config::{CacheConfig, CompactionConfig, VersioConfig};
pub use error::{VersioError, VersioResult};
pub use logging::{init_tracing, init_tracing_at};
pub use repository::{DocumentGraph, DocumentRepository, DocumentVersion};

// Re-export key types
pub use versio_cache::{GraphCache, GraphOptions};
pub use versio_graph::{VersionGraph, VersionNode};
pub use versio_merge::Merge;
pub use versio_path::{PropertyPath, PropertyValue};
pub use versio_store::{InMemoryVersionStore, VersionStore};
pub use versio_types::{Revision, RevisionClock, Version, VersionType, DEFAULT_BRANCH};
