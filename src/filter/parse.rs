use crate::{
    error::{Error, Result},
    filter::{self, matcher},
};

use serde_json::{Map, Value};

/// Key segment separator.
const KEY_SEPARATOR: char = ':';

/// Parsed filter key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FilterKey {
    /// Document field.
    pub field: String,
    /// Comparison operator, `eq` unless written.
    pub operator: filter::Operator,
    /// Coercion type, `string` unless written.
    pub value_type: filter::ValueType,
    /// Whether the type was written.
    pub explicit_type: bool,
}

/// Parse `field`, `field:operator` or `field:operator:type`.
pub fn parse_key(key: &str) -> Result<FilterKey> {
    let mut parts = key.split(KEY_SEPARATOR);
    let field = parts.next().unwrap_or_default().trim();
    if field.is_empty() {
        return Err(Error::InvalidFilter(format!("missing field in {key:?}")));
    }
    let operator = match parts.next() {
        Some(operator) => operator.trim().parse()?,
        None => filter::Operator::default(),
    };
    let (value_type, explicit_type) = match parts.next() {
        Some(value_type) => (value_type.trim().parse()?, true),
        None => (filter::ValueType::default(), false),
    };
    if parts.next().is_some() {
        return Err(Error::InvalidFilter(format!(
            "expected field[:operator[:type]], got {key:?}"
        )));
    }
    Ok(FilterKey {
        field: field.to_string(),
        operator,
        value_type,
        explicit_type,
    })
}

/// Parse one `key: value` entry, coercing the value to the key's type.
pub fn parse_filter(key: &str, value: &Value) -> Result<filter::Filter> {
    let FilterKey {
        field,
        operator,
        value_type,
        explicit_type,
    } = parse_key(key)?;
    let coerced = match operator {
        filter::Operator::Starts | filter::Operator::Ends => {
            matcher::coerce(value, filter::ValueType::String)
        }
        _ => matcher::coerce(value, value_type),
    }
    .ok_or_else(|| {
        Error::InvalidFilter(format!("{key:?}: {value} is not a valid {value_type:?}"))
    })?;
    Ok(filter::Filter {
        field,
        operator,
        value_type,
        explicit_type,
        value: value.clone(),
        coerced,
    })
}

/// Parse every entry of a filter object.
pub fn parse_filters(filters: &Map<String, Value>) -> Result<Vec<filter::Filter>> {
    filters
        .iter()
        .map(|(key, value)| parse_filter(key, value))
        .collect()
}
