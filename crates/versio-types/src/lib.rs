//! Foundation types for versio.
//!
//! Every other versio crate depends on `versio-types`.
//!
//! # Key Types
//!
//! - [`Revision`]: Totally ordered, globally unique version identifier
//! - [`RevisionClock`]: Writer-scoped generator of strictly increasing revisions
//! - [`Version`]: Immutable commit record: branch, parents, type, changeset, metadata
//! - [`VersionBuilder`]: Fluent constructor for [`Version`]
//! - [`VersionProperty`]: A value together with the revision that wrote it
//! - [`SharedMap`]: Ordered map whose clones share structure

pub mod clock;
pub mod error;
pub mod property;
pub mod revision;
pub mod shared;
pub mod version;

pub use clock::RevisionClock;
pub use error::TypeError;
pub use property::VersionProperty;
pub use revision::Revision;
pub use shared::SharedMap;
pub use version::{Changeset, Version, VersionBuilder, VersionType, DEFAULT_BRANCH};
