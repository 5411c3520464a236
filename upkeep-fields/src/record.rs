//! Entity records as opaque JSON objects.
//!
//! The engine assumes nothing about a record beyond "has an `id`" and "has the
//! keys named by the active schema".

use serde_json::{Map, Value};

/// A key-value record returned by or sent to the backend.
pub type Record = Map<String, Value>;

/// The record's `id` as a string. Numeric ids are rendered without quotes.
pub fn record_id(record: &Record) -> Option<String> {
    match record.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Look up a dotted path (`location.name`) in a record.
pub fn lookup_path<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    if let Some(value) = record.get(path) {
        return Some(value);
    }
    let mut segments = path.split('.');
    let mut current = record.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Whether a value counts as "not filled in" for required-field checks.
///
/// `false` and `0` are answers, not blanks.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
