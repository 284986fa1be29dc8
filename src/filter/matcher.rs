use crate::{filter, shadow::codec};

use serde_json::Value;

/// Coerce `value` to `value_type`, `None` when it has no such reading.
pub fn coerce(value: &Value, value_type: filter::ValueType) -> Option<filter::Coerced> {
    match value_type {
        filter::ValueType::String => match value {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
        .map(filter::Coerced::String),
        filter::ValueType::Number => match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
        .filter(|number: &f64| number.is_finite())
        .map(filter::Coerced::Number),
        filter::ValueType::Date => codec::parse_datetime(value).map(filter::Coerced::Date),
        filter::ValueType::Boolean => match value {
            Value::Bool(flag) => Some(*flag),
            Value::String(text) => match text.trim() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            Value::Number(number) => match number.as_u64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            _ => None,
        }
        .map(filter::Coerced::Boolean),
    }
}

/// Value of `field` in `document`; dots descend into nested objects when the
/// document has no field with the literal name.
pub fn lookup<'a>(document: &'a Value, field: &str) -> Option<&'a Value> {
    if let Some(value) = document.get(field) {
        return Some(value);
    }
    field
        .split('.')
        .try_fold(document, |value, segment| value.get(segment))
}

/// Whether `document` satisfies `filter`. Absent or null fields never match.
pub fn matches(document: &Value, filter: &filter::Filter) -> bool {
    let Some(stored) = lookup(document, &filter.field).filter(|value| !value.is_null()) else {
        return false;
    };
    let value_type = match filter.operator {
        filter::Operator::Starts | filter::Operator::Ends => filter::ValueType::String,
        _ => filter.value_type,
    };
    let Some(stored) = coerce(stored, value_type) else {
        return false;
    };
    match (filter.operator, &stored, &filter.coerced) {
        (filter::Operator::Eq, stored, expected) => stored == expected,
        (filter::Operator::Lt, stored, expected) => stored < expected,
        (filter::Operator::Lte, stored, expected) => stored <= expected,
        (filter::Operator::Gt, stored, expected) => stored > expected,
        (filter::Operator::Gte, stored, expected) => stored >= expected,
        (
            filter::Operator::Starts,
            filter::Coerced::String(stored),
            filter::Coerced::String(expected),
        ) => stored.starts_with(expected.as_str()),
        (
            filter::Operator::Ends,
            filter::Coerced::String(stored),
            filter::Coerced::String(expected),
        ) => stored.ends_with(expected.as_str()),
        _ => false,
    }
}

/// Whether `document` satisfies every filter.
pub fn matches_all(document: &Value, filters: &[filter::Filter]) -> bool {
    filters.iter().all(|filter| matches(document, filter))
}
