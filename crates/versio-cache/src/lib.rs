//! Graph cache for versio.
//!
//! [`GraphCache`] memoises the version graph of each document loaded from a
//! [`VersionStore`](versio_store::VersionStore) and refreshes it
//! incrementally. [`GraphOptions`] decide when a cached graph is compacted
//! and which versions survive.

pub mod cache;
pub mod error;
pub mod options;

pub use cache::GraphCache;
pub use error::{CacheError, CacheResult};
pub use options::{GraphOptions, GraphOptionsBuilder, RetainFn, TriggerFn};
