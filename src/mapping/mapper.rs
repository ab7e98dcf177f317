//! Applies a [`RuleDocument`] to one raw record.

use serde_json::Value;

use crate::error::{IngestionError, IngestionResult};
use crate::types::{Record, Rule, RuleDocument};

use super::path::resolve;

/// Map `record` through `rules`.
///
/// - [`Rule::Path`]: resolved against the record root; unresolved paths are skipped silently.
/// - [`Rule::Nested`]: every nested path is also resolved from the record root (not from a
///   sub-object); the nested output object is emitted only if at least one path resolved.
/// - [`Rule::Unsupported`]: ignored.
///
/// Mapping is all-or-nothing: if nothing resolved, returns [`IngestionError::NoMatchingFields`]
/// and no partial record escapes.
pub fn map_record(record: &Record, rules: &RuleDocument) -> IngestionResult<Record> {
    let mut out = Record::new();

    for (target, rule) in rules.iter() {
        match rule {
            Rule::Path(path) => {
                if let Some(v) = resolve(record, path) {
                    out.insert(target.to_string(), v.clone());
                }
            }
            Rule::Nested(nested) => {
                let mut inner = Record::new();
                for (nested_target, path) in nested {
                    if let Some(v) = resolve(record, path) {
                        inner.insert(nested_target.clone(), v.clone());
                    }
                }
                if !inner.is_empty() {
                    out.insert(target.to_string(), Value::Object(inner));
                }
            }
            Rule::Unsupported(_) => {}
        }
    }

    if out.is_empty() {
        return Err(IngestionError::NoMatchingFields);
    }
    Ok(out)
}

/// Returns the target field whose path rule is exactly `source_path`, or `source_path` itself.
pub fn find_mapped_key<'a>(source_path: &'a str, rules: &'a RuleDocument) -> &'a str {
    rules
        .iter()
        .find_map(|(target, rule)| match rule {
            Rule::Path(p) if p == source_path => Some(target),
            _ => None,
        })
        .unwrap_or(source_path)
}
