//! JSON record loading.
//!
//! Supported payload shapes:
//! - A single object: `{"id":"1"}`
//! - An array of objects: `[{"id":"1"}, {"id":"2"}]`
//! - An object wrapping the records under a rule key: `{"users": [{"id":"1"}]}`
//! - An envelope wrapping the records under a named property: `{"value": [{"id":"1"}]}`

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::{IngestionError, IngestionResult};
use crate::types::{Record, RuleDocument};

/// Read a file and load its records, unwrapping `property` first (see [`load_by_property`]).
pub fn load_from_path(
    path: impl AsRef<Path>,
    rules: &RuleDocument,
    property: &str,
) -> IngestionResult<Vec<Record>> {
    let bytes = fs::read(path)?;
    load_by_property(&bytes, rules, property)
}

/// Parse `bytes` into zero or more raw records.
///
/// 1. A JSON object is searched for records with [`locate_records`]; if none are found the object
///    itself is the single record.
/// 2. Otherwise an array of objects is returned as-is.
/// 3. Anything else fails with [`IngestionError::UnexpectedStructure`].
pub fn load(bytes: &[u8], rules: &RuleDocument) -> IngestionResult<Vec<Record>> {
    if let Ok(doc) = serde_json::from_slice::<Record>(bytes) {
        let located = locate_records(&doc, rules);
        if !located.is_empty() {
            return Ok(located);
        }
        return Ok(vec![doc]);
    }

    if let Ok(records) = serde_json::from_slice::<Vec<Record>>(bytes) {
        return Ok(records);
    }

    Err(IngestionError::UnexpectedStructure {
        keys: top_level_keys(bytes),
    })
}

/// Unwrap an envelope such as `{"value": [...]}` before running [`load`].
///
/// If `bytes` is an object whose `property` holds an array, that array is loaded. In every other
/// case (property absent, not an array, or the payload is not an object) the input bytes are
/// loaded unchanged.
pub fn load_by_property(
    bytes: &[u8],
    rules: &RuleDocument,
    property: &str,
) -> IngestionResult<Vec<Record>> {
    if let Ok(mut doc) = serde_json::from_slice::<Record>(bytes) {
        match doc.remove(property) {
            Some(Value::Array(items)) => return load_array(items),
            Some(_) => tracing::warn!(property, "envelope property is not an array"),
            None => {}
        }
    }
    load(bytes, rules)
}

// Same outcome as re-serializing the array and passing it through `load`: a top-level array is
// accepted only when every element is an object.
fn load_array(items: Vec<Value>) -> IngestionResult<Vec<Record>> {
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            _ => Err(IngestionError::UnexpectedStructure { keys: Vec::new() }),
        })
        .collect()
}

/// Find the records wrapped inside `doc`, guided by the rule keys.
///
/// For each rule key present in `doc`:
/// - an array value yields its object elements, if there is at least one;
/// - an object value yields that object as a single record.
///
/// The first match wins. Only the root object is inspected; records nested deeper than one level
/// are not discovered. Returns an empty list when no rule key matches.
pub fn locate_records(doc: &Record, rules: &RuleDocument) -> Vec<Record> {
    for key in rules.keys() {
        match doc.get(key) {
            Some(Value::Array(items)) => {
                let objects: Vec<Record> = items
                    .iter()
                    .filter_map(|item| item.as_object().cloned())
                    .collect();
                if !objects.is_empty() {
                    return objects;
                }
            }
            Some(Value::Object(nested)) => return vec![nested.clone()],
            _ => {}
        }
    }
    Vec::new()
}

/// Top-level keys of a JSON object payload; empty if `bytes` is not an object.
pub fn top_level_keys(bytes: &[u8]) -> Vec<String> {
    serde_json::from_slice::<Record>(bytes)
        .map(|doc| doc.keys().cloned().collect())
        .unwrap_or_default()
}
