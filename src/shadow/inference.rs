use crate::shadow;

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// A date, alone or followed by a time part.
static ISO_DATE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}(?:$|T)").expect("static pattern")
});

/// Logical type of `value`, or `None` when the value carries no sortable content.
pub fn infer(value: &Value) -> Option<shadow::FieldType> {
    match value {
        Value::Null => None,
        Value::String(text) if ISO_DATE_PREFIX.is_match(text) => Some(shadow::FieldType::Datetime),
        Value::String(_) => Some(shadow::FieldType::String),
        Value::Number(_) => Some(shadow::FieldType::Number),
        Value::Bool(_) => Some(shadow::FieldType::Boolean),
        Value::Array(_) => Some(shadow::FieldType::Array),
        Value::Object(_) => Some(shadow::FieldType::Object),
    }
}

/// Type of `field` holding `value`, `None` for fields that never get shadow records.
pub fn infer_field(field: &str, value: &Value) -> Option<shadow::FieldType> {
    if !shadow::is_shadowable_field(field) {
        return None;
    }
    infer(value)
}
