//! Serialized record state stored in `old_values` / `new_values`
//!
//! A single record becomes a JSON object, a collection a JSON array of
//! objects in order. Credentials and the soft-delete marker are dropped by
//! name. Anything else that cannot be rendered this way becomes the empty
//! string.

use serde_json::{Map, Value as JsonValue};

/// Field names never written to the audit log
pub const EXCLUDED_FIELDS: &[&str] = &["password", "password_hash", "deleted_at"];

fn strip(map: &Map<String, JsonValue>) -> Map<String, JsonValue> {
    map.iter()
        .filter(|(name, _)| !EXCLUDED_FIELDS.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

fn filtered(value: &JsonValue) -> Option<JsonValue> {
    match value {
        JsonValue::Object(map) => Some(JsonValue::Object(strip(map))),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| match item {
                JsonValue::Object(map) => Some(JsonValue::Object(strip(map))),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(JsonValue::Array),
        _ => None,
    }
}

/// Render a serialized record (or collection of records) for storage
pub fn encode(value: &JsonValue) -> String {
    filtered(value)
        .and_then(|v| serde_json::to_string(&v).ok())
        .unwrap_or_default()
}

/// Render an optional snapshot, empty when absent
pub fn encode_opt(value: Option<&JsonValue>) -> String {
    value.map(encode).unwrap_or_default()
}

/// Positive value of a top-level `id` field on a single record
pub fn id_field(value: &JsonValue) -> Option<i64> {
    value
        .as_object()
        .and_then(|map| map.get("id"))
        .and_then(JsonValue::as_i64)
        .filter(|id| *id > 0)
}
