//! Property paths for versio documents.
//!
//! Documents are versioned as flat maps from [`PropertyPath`] to
//! [`PropertyValue`]. This crate parses and prints paths, flattens any
//! `serde` value into such a map and rebuilds it, and computes the changeset
//! between two flattened documents.
//!
//! # Key Types
//!
//! - [`PropertyPath`] / [`PathElement`] -- Location of a value (`a.b[0]`)
//! - [`PropertyValue`] -- Scalar, container marker, or reference
//! - [`PropertyMap`] -- A flattened document
//! - [`to_properties`] / [`from_properties`] / [`diff`] -- Mapping functions

pub mod error;
pub mod mapper;
pub mod path;
pub mod value;

pub use error::{PathError, PathResult};
pub use mapper::{
    diff, flatten_value, from_properties, rebuild_value, to_properties, PropertyMap,
    MAX_SEQUENCE_LEN,
};
pub use path::{PathElement, PropertyPath};
pub use value::{Number, PropertyValue, REFERENCE_KEY};
