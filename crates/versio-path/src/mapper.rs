//! Mapping between serde values and flat property maps.
//!
//! Any `Serialize` value is flattened through [`serde_json::Value`]:
//! objects become an [`Associative`](PropertyValue::Associative) marker plus
//! one entry per field, arrays a [`Sequence`](PropertyValue::Sequence) marker
//! plus one entry per element, and `null` is simply absent. Rebuilding runs
//! the other way and hands the tree to `Deserialize`.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use versio_types::Changeset;

use crate::error::{PathError, PathResult};
use crate::path::{PathElement, PropertyPath};
use crate::value::{PropertyValue, REFERENCE_KEY};

/// Longest sequence [`rebuild_value`] will materialize. Sequence markers carry
/// the length on their own, so a larger one is rejected before allocating.
pub const MAX_SEQUENCE_LEN: usize = 1 << 20;

/// A flattened document.
pub type PropertyMap = BTreeMap<PropertyPath, PropertyValue>;

/// Flatten `object` into its properties.
pub fn to_properties<T: Serialize + ?Sized>(object: &T) -> PathResult<PropertyMap> {
    let value = serde_json::to_value(object)?;
    Ok(flatten_value(&value))
}

/// Flatten an already serialized JSON value.
pub fn flatten_value(value: &Value) -> PropertyMap {
    let mut properties = PropertyMap::new();
    flatten(PropertyPath::root(), value, &mut properties);
    properties
}

fn flatten(path: PropertyPath, value: &Value, out: &mut PropertyMap) {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            out.insert(path, PropertyValue::Bool(*b));
        }
        Value::Number(n) => {
            out.insert(path, PropertyValue::Number(n.into()));
        }
        Value::String(s) => {
            out.insert(path, PropertyValue::String(s.clone()));
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten(path.index(i), item, out);
            }
            out.insert(path, PropertyValue::Sequence(items.len()));
        }
        Value::Object(map) => {
            if let Some(id) = reference_id(map) {
                out.insert(path, PropertyValue::Reference(id.to_string()));
                return;
            }
            for (name, field) in map {
                flatten(path.property(name.as_str()), field, out);
            }
            out.insert(path, PropertyValue::Associative);
        }
    }
}

fn reference_id(map: &Map<String, Value>) -> Option<&str> {
    if map.len() != 1 {
        return None;
    }
    map.get(REFERENCE_KEY)?.as_str()
}

/// Rebuild an object from its properties.
pub fn from_properties<T: DeserializeOwned>(properties: &PropertyMap) -> PathResult<T> {
    let value = rebuild_value(properties)?;
    Ok(serde_json::from_value(value)?)
}

/// Rebuild the JSON tree described by `properties`.
///
/// Entries below a scalar, and sequence elements past the recorded length,
/// are ignored. A missing root yields `null`.
pub fn rebuild_value(properties: &PropertyMap) -> PathResult<Value> {
    let root = PropertyPath::root();
    match properties.get(&root) {
        Some(value) => build(&root, value, properties),
        None => Ok(Value::Null),
    }
}

fn build(path: &PropertyPath, value: &PropertyValue, properties: &PropertyMap) -> PathResult<Value> {
    let value = match value {
        PropertyValue::Bool(b) => Value::Bool(*b),
        PropertyValue::Number(n) => Value::from(*n),
        PropertyValue::String(s) => Value::String(s.clone()),
        PropertyValue::Reference(id) => {
            let mut map = Map::new();
            map.insert(REFERENCE_KEY.to_string(), Value::String(id.clone()));
            Value::Object(map)
        }
        PropertyValue::Sequence(len) => {
            if *len > MAX_SEQUENCE_LEN {
                return Err(conflict(path, "sequence length exceeds limit"));
            }
            let mut items = vec![Value::Null; *len];
            for (child, child_value) in children(path, properties) {
                match child.last() {
                    Some(PathElement::Index(i)) => {
                        if let Some(slot) = items.get_mut(*i) {
                            *slot = build(child, child_value, properties)?;
                        }
                    }
                    _ => return Err(conflict(child, "named property inside a sequence")),
                }
            }
            Value::Array(items)
        }
        PropertyValue::Associative => {
            let mut map = Map::new();
            for (child, child_value) in children(path, properties) {
                match child.last() {
                    Some(PathElement::Property(name)) => {
                        map.insert(name.clone(), build(child, child_value, properties)?);
                    }
                    _ => return Err(conflict(child, "index inside an associative value")),
                }
            }
            Value::Object(map)
        }
    };
    Ok(value)
}

/// Direct children of `path`. Descendants of a path sort right after it.
fn children<'a>(
    path: &'a PropertyPath,
    properties: &'a PropertyMap,
) -> impl Iterator<Item = (&'a PropertyPath, &'a PropertyValue)> + 'a {
    let depth = path.len() + 1;
    properties
        .range(path..)
        .take_while(move |(key, _)| key.starts_with(path))
        .filter(move |(key, _)| key.len() == depth)
}

fn conflict(path: &PropertyPath, reason: &'static str) -> PathError {
    PathError::Conflict {
        path: path.to_string(),
        reason,
    }
}

/// Changes that turn `old` into `new`.
///
/// Keys only in `new` or with a different value map to `Some`, keys only in
/// `old` map to `None`. Unchanged keys are left out.
pub fn diff<K, V>(old: &BTreeMap<K, V>, new: &BTreeMap<K, V>) -> Changeset<K, V>
where
    K: Ord + Clone,
    V: Clone + PartialEq,
{
    let mut changes = Changeset::new();

    for (key, old_val) in old {
        if !new.contains_key(key) {
            changes.insert(key.clone(), None);
        } else if new.get(key) != Some(old_val) {
            changes.insert(key.clone(), new.get(key).cloned());
        }
    }

    for (key, new_val) in new {
        if !old.contains_key(key) {
            changes.insert(key.clone(), Some(new_val.clone()));
        }
    }

    changes
}
