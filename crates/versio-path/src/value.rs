//! Property values: the leaves and container markers of a flattened document.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key of the single property that marks an object as a reference.
pub const REFERENCE_KEY: &str = "$ref";

/// A numeric property.
///
/// Integers keep their exact value; anything else is stored as a float.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Number {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl From<&serde_json::Number> for Number {
    fn from(n: &serde_json::Number) -> Self {
        if let Some(i) = n.as_i64() {
            Number::Int(i)
        } else if let Some(u) = n.as_u64() {
            Number::UInt(u)
        } else {
            Number::Float(n.as_f64().unwrap_or(f64::NAN))
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(i) => Value::from(i),
            Number::UInt(u) => Value::from(u),
            // Non-finite floats become null.
            Number::Float(f) => Value::from(f),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::UInt(u) => write!(f, "{u}"),
            Number::Float(x) => write!(f, "{x}"),
        }
    }
}

/// The value stored at one [`PropertyPath`](crate::PropertyPath).
///
/// Containers are stored as markers, their contents live at child paths.
/// A [`Sequence`](Self::Sequence) records its length so trailing elements
/// removed by a later version are not resurrected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Number(Number),
    String(String),
    /// Array marker with the number of elements.
    Sequence(usize),
    /// Object marker.
    Associative,
    /// Identifier of another document, written as `{"$ref": id}`.
    Reference(String),
}

impl PropertyValue {
    pub fn is_container(&self) -> bool {
        matches!(self, PropertyValue::Sequence(_) | PropertyValue::Associative)
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Number(_) => "number",
            PropertyValue::String(_) => "string",
            PropertyValue::Sequence(_) => "sequence",
            PropertyValue::Associative => "associative",
            PropertyValue::Reference(_) => "reference",
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Number(Number::Int(i))
    }
}

impl From<f64> for PropertyValue {
    fn from(x: f64) -> Self {
        PropertyValue::Number(Number::Float(x))
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Number(n) => write!(f, "{n}"),
            PropertyValue::String(s) => write!(f, "{s:?}"),
            PropertyValue::Sequence(len) => write!(f, "[..{len}]"),
            PropertyValue::Associative => f.write_str("{..}"),
            PropertyValue::Reference(id) => write!(f, "&{id}"),
        }
    }
}
