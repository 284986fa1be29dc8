use crate::shadow;

use serde_json::{Map, Value};

/// Rebuild `value` with a canonical field order, recursively.
///
/// Objects list `id` first, then the other fields alphabetically, then the
/// timestamp fields in the given order. Array element order is kept.
pub fn normalize(value: &Value, timestamp_fields: [&str; 2]) -> Value {
    match value {
        Value::Object(map) => Value::Object(normalize_map(map, timestamp_fields)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| normalize(item, timestamp_fields))
                .collect(),
        ),
        scalar => scalar.clone(),
    }
}

fn normalize_map(map: &Map<String, Value>, timestamp_fields: [&str; 2]) -> Map<String, Value> {
    let mut middle: Vec<&String> = map
        .keys()
        .filter(|key| key.as_str() != shadow::ID_FIELD && !timestamp_fields.contains(&key.as_str()))
        .collect();
    middle.sort();
    let order = std::iter::once(shadow::ID_FIELD)
        .chain(middle.into_iter().map(String::as_str))
        .chain(timestamp_fields);
    let mut normalized = Map::with_capacity(map.len());
    for key in order {
        if let Some(value) = map.get(key) {
            normalized.insert(key.to_string(), normalize(value, timestamp_fields));
        }
    }
    normalized
}
