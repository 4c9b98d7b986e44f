//! Version storage for versio.
//!
//! A store keeps the version history of many documents. Writers append
//! versions and publish them; publishing assigns store-wide ordinals, which
//! let readers fetch only what they have not seen yet.
//!
//! # Storage Backends
//!
//! All backends implement the [`VersionStore`] trait:
//!
//! - [`InMemoryVersionStore`] -- `RwLock`-guarded store for tests and embedding
//!
//! Batches of versions can be moved between processes with
//! [`encode_versions`] / [`decode_versions`].

pub mod codec;
pub mod error;
pub mod memory;
pub mod traits;

pub use codec::{decode_versions, encode_versions};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryVersionStore;
pub use traits::{StoredVersion, VersionStore};
