use serde::{Deserialize, Serialize};

use crate::revision::Revision;

/// A property value together with the revision that wrote it.
///
/// `value == None` records a deletion.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionProperty<V> {
    /// The revision whose changeset wrote this value.
    pub revision: Revision,
    /// The written value, or `None` for a deletion.
    pub value: Option<V>,
}

impl<V> VersionProperty<V> {
    /// Create a property written by `revision`.
    pub fn new(revision: Revision, value: Option<V>) -> Self {
        Self { revision, value }
    }

    /// Returns `true` if this property records a deletion.
    pub fn is_deletion(&self) -> bool {
        self.value.is_none()
    }
}
