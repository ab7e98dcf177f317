//! Dot-path resolution against nested JSON objects.

use serde_json::Value;

use crate::types::Record;

/// Resolve a dot-separated `path` (e.g. `signInActivity.lastSignInDateTime`) against `root`.
///
/// Each segment must land on an object containing the next key. Returns `None` as soon as a key is
/// missing or an intermediate value is a scalar or an array. Traversal only descends, so it takes
/// exactly one step per segment.
pub fn resolve<'a>(root: &'a Record, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;

    for segment in segments {
        match current {
            Value::Object(map) => current = map.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}
