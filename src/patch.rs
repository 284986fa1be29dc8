//! JSON Merge Patch (RFC 7396).

use serde_json::{Map, Value};

/// Apply `patch` to `target` in place.
///
/// An object patch merges key by key and removes keys patched to `null`;
/// any other patch replaces the target wholesale.
///
/// ```rust
/// use dynamodb_shadow::patch;
/// use serde_json::json;
///
/// let mut document = json!({"title": "a", "tags": ["x"], "meta": {"a": 1, "b": 2}});
/// patch::apply(&mut document, &json!({"tags": null, "meta": {"b": null, "c": 3}}));
/// assert_eq!(document, json!({"title": "a", "meta": {"a": 1, "c": 3}}));
/// ```
pub fn apply(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target) = target {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(key);
            } else {
                apply(target.entry(key.as_str()).or_insert(Value::Null), value);
            }
        }
    }
}

/// `target` with `patch` applied.
pub fn merged(target: &Value, patch: &Value) -> Value {
    let mut target = target.clone();
    apply(&mut target, patch);
    target
}
