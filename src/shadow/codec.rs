use crate::{
    config::{CodecConfig, NumberEncoding},
    shadow::{self, normalize},
};

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;

/// Failure to encode a value as the requested type.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EncodeError {
    /// Number outside the range the configured padding can represent.
    #[error("{value} is outside [-10^{padding}, 10^{padding})")]
    OutOfRange {
        /// Offending value.
        value: f64,
        /// Configured padding.
        padding: u32,
    },
    /// Value that does not denote a valid date.
    #[error("{0} is not a valid date")]
    InvalidDatetime(String),
    /// Value whose JSON kind cannot be encoded as the type.
    #[error("cannot encode {found} as {expected:?}")]
    TypeMismatch {
        /// Requested type.
        expected: shadow::FieldType,
        /// JSON kind found.
        found: &'static str,
    },
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Escape the separator alphabet: `#` becomes `##`, space becomes `#`.
///
/// ```rust
/// use dynamodb_shadow::shadow::codec;
///
/// assert_eq!(codec::escape("Old Name"), "Old#Name");
/// assert_eq!(codec::escape("a#b"), "a##b");
/// ```
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for character in value.chars() {
        match character {
            '#' => escaped.push_str("##"),
            ' ' => escaped.push('#'),
            character => escaped.push(character),
        }
    }
    escaped
}

/// Longest prefix of `value` no longer than `max_bytes`, cut at a character boundary.
pub fn truncate(value: &str, max_bytes: usize) -> &str {
    if value.len() <= max_bytes {
        return value;
    }
    let mut end = max_bytes;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// Parse a date-like value: RFC 3339 text, a bare date, a naive date-time (read as
/// UTC) or epoch milliseconds.
pub fn parse_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
                return Some(datetime.with_timezone(&Utc));
            }
            if let Ok(datetime) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(datetime.and_utc());
            }
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|datetime| datetime.and_utc())
        }
        Value::Number(number) => {
            let millis = match number.as_i64() {
                Some(millis) => millis,
                None => number.as_f64()?.floor() as i64,
            };
            DateTime::from_timestamp_millis(millis)
        }
        _ => None,
    }
}

/// Render `datetime` the way shadow keys and timestamps store it.
pub fn format_datetime(datetime: &DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Shadow value encoder.
///
/// ```rust
/// use dynamodb_shadow::{config, shadow};
/// use serde_json::json;
///
/// let config = config::CodecConfig {
///     number_padding: 3,
///     ..Default::default()
/// };
/// let codec = shadow::codec::Codec::new(&config, "createdAt", "updatedAt");
/// assert_eq!(codec.encode(&json!(-5), shadow::FieldType::Number).unwrap(), "0995");
/// assert_eq!(codec.encode(&json!(5), shadow::FieldType::Number).unwrap(), "1005");
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Codec<'a> {
    config: &'a CodecConfig,
    timestamp_fields: [&'a str; 2],
}

impl<'a> Codec<'a> {
    /// Encoder for `config`; the timestamp fields go last in normalized objects.
    pub fn new(config: &'a CodecConfig, created_at: &'a str, updated_at: &'a str) -> Self {
        Self {
            config,
            timestamp_fields: [created_at, updated_at],
        }
    }

    /// Encode `value` as `field_type`. `null` encodes as the empty string for every type.
    pub fn encode(&self, value: &Value, field_type: shadow::FieldType) -> Result<String, EncodeError> {
        if value.is_null() {
            return Ok(String::new());
        }
        let mismatch = || EncodeError::TypeMismatch {
            expected: field_type,
            found: kind(value),
        };
        match field_type {
            shadow::FieldType::String => {
                let text = match value {
                    Value::String(text) => text.clone(),
                    Value::Bool(_) | Value::Number(_) => value.to_string(),
                    _ => return Err(mismatch()),
                };
                Ok(self.escape_and_truncate(&text, self.config.max_bytes))
            }
            shadow::FieldType::Number => {
                let number = match value {
                    Value::Number(number) => number.as_f64(),
                    Value::String(text) => text.trim().parse().ok(),
                    _ => None,
                }
                .filter(|number: &f64| number.is_finite())
                .ok_or_else(mismatch)?;
                self.encode_number(number)
            }
            shadow::FieldType::Boolean => match value {
                Value::Bool(true) => Ok("1".to_string()),
                Value::Bool(false) => Ok("0".to_string()),
                Value::String(text) if text == "true" => Ok("1".to_string()),
                Value::String(text) if text == "false" => Ok("0".to_string()),
                _ => Err(mismatch()),
            },
            shadow::FieldType::Datetime => parse_datetime(value)
                .map(|datetime| format_datetime(&datetime))
                .ok_or_else(|| EncodeError::InvalidDatetime(value.to_string())),
            shadow::FieldType::Array | shadow::FieldType::Object => {
                let matches = match field_type {
                    shadow::FieldType::Array => value.is_array(),
                    _ => value.is_object(),
                };
                if !matches {
                    return Err(mismatch());
                }
                let normalized = normalize::normalize(value, self.timestamp_fields);
                Ok(self.escape_and_truncate(&normalized.to_string(), 2 * self.config.max_bytes))
            }
        }
    }

    fn escape_and_truncate(&self, text: &str, max_bytes: usize) -> String {
        truncate(&escape(text), max_bytes).to_string()
    }

    fn encode_number(&self, number: f64) -> Result<String, EncodeError> {
        let padding = self.config.number_padding;
        let out_of_range = || EncodeError::OutOfRange {
            value: number,
            padding,
        };
        let base = 10_i64.checked_pow(padding).ok_or_else(out_of_range)?;
        let limit = base as f64;
        let floor = number.floor();
        match self.config.number_encoding {
            NumberEncoding::Offset => {
                if floor < -limit || floor >= limit {
                    return Err(out_of_range());
                }
                let offset = floor as i64 + base;
                Ok(format!("{offset:0width$}", width = padding as usize + 1))
            }
            NumberEncoding::Legacy => {
                if floor >= limit {
                    return Err(out_of_range());
                }
                let clamped = floor.max(0.0) as i64;
                Ok(format!("{clamped:0width$}", width = padding as usize))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use serde_json::json;

    fn config(padding: u32) -> CodecConfig {
        CodecConfig {
            max_bytes: 16,
            number_padding: padding,
            ..Default::default()
        }
    }

    #[rstest]
    #[case::plain("abc", "abc")]
    #[case::space("Old Name", "Old#Name")]
    #[case::separator("a#b", "a##b")]
    #[case::both("a# b", "a###b")]
    #[case::unicode("café au lait", "café#au#lait")]
    fn test_escape(#[case] value: &str, #[case] expected: &str) {
        assert_eq!(escape(value), expected);
    }

    #[test]
    fn test_escape_distinguishes_arrangements() {
        let values = ["a#b", "a b", "ab#", "ab ", "#ab", " ab", "a b c", "a ## b"];
        let escaped: std::collections::HashSet<String> =
            values.iter().map(|value| escape(value)).collect();
        assert_eq!(escaped.len(), values.len());
    }

    #[test]
    fn test_escape_is_not_injective_around_adjacent_separators() {
        // "a #" and "a# " both escape to "a###"; the trailing id segment keeps the
        // shadow keys distinct and memory filtering keeps query results exact.
        assert_eq!(escape("a #"), escape("a# "));
    }

    #[rstest]
    #[case::fits("abc", 5, "abc")]
    #[case::exact("abcde", 5, "abcde")]
    #[case::ascii("abcdef", 5, "abcde")]
    #[case::two_byte_boundary("aé", 2, "a")]
    #[case::two_byte_fits("aé", 3, "aé")]
    #[case::four_byte("a😀b", 4, "a")]
    #[case::four_byte_fits("a😀b", 5, "a😀")]
    #[case::three_byte_run("日本語", 7, "日本")]
    #[case::zero("日本語", 0, "")]
    fn test_truncate_at_char_boundary(
        #[case] value: &str,
        #[case] max_bytes: usize,
        #[case] expected: &str,
    ) {
        assert_eq!(truncate(value, max_bytes), expected);
    }

    #[rstest]
    #[case::string(json!("Old Name"), shadow::FieldType::String, "Old#Name")]
    #[case::string_truncated(json!("0123456789 abcdefghij"), shadow::FieldType::String, "0123456789#abcde")]
    #[case::string_from_number(json!(42), shadow::FieldType::String, "42")]
    #[case::zero(json!(0), shadow::FieldType::Number, "1000")]
    #[case::positive(json!(5), shadow::FieldType::Number, "1005")]
    #[case::negative(json!(-5), shadow::FieldType::Number, "0995")]
    #[case::fraction_floors(json!(5.9), shadow::FieldType::Number, "1005")]
    #[case::negative_fraction_floors(json!(-0.5), shadow::FieldType::Number, "0999")]
    #[case::lowest(json!(-1000), shadow::FieldType::Number, "0000")]
    #[case::highest(json!(999), shadow::FieldType::Number, "1999")]
    #[case::numeric_string(json!("12"), shadow::FieldType::Number, "1012")]
    #[case::true_(json!(true), shadow::FieldType::Boolean, "1")]
    #[case::false_(json!(false), shadow::FieldType::Boolean, "0")]
    #[case::null_boolean(json!(null), shadow::FieldType::Boolean, "")]
    #[case::null_number(json!(null), shadow::FieldType::Number, "")]
    #[case::datetime_utc(json!("2024-03-01T10:20:30Z"), shadow::FieldType::Datetime, "2024-03-01T10:20:30.000Z")]
    #[case::datetime_offset(json!("2024-03-01T10:20:30.5+02:00"), shadow::FieldType::Datetime, "2024-03-01T08:20:30.500Z")]
    #[case::datetime_date(json!("2024-03-01"), shadow::FieldType::Datetime, "2024-03-01T00:00:00.000Z")]
    #[case::datetime_naive(json!("2024-03-01T10:20:30.123456"), shadow::FieldType::Datetime, "2024-03-01T10:20:30.123Z")]
    #[case::datetime_millis(json!(0), shadow::FieldType::Datetime, "1970-01-01T00:00:00.000Z")]
    #[case::array(json!(["a b", 1]), shadow::FieldType::Array, r#"["a#b",1]"#)]
    #[case::object(json!({"b": 1, "id": "x", "a": "#"}), shadow::FieldType::Object, r###"{"id":"x","a":"##","b":1}"###)]
    fn test_encode(#[case] value: Value, #[case] field_type: shadow::FieldType, #[case] expected: &str) {
        let config = config(3);
        let codec = Codec::new(&config, "createdAt", "updatedAt");
        assert_eq!(codec.encode(&value, field_type).unwrap(), expected);
    }

    #[rstest]
    #[case::above(json!(1000), shadow::FieldType::Number)]
    #[case::below(json!(-1001), shadow::FieldType::Number)]
    #[case::below_fraction(json!(-1000.5), shadow::FieldType::Number)]
    #[case::not_a_number(json!("five"), shadow::FieldType::Number)]
    #[case::invalid_date(json!("2024-13-45"), shadow::FieldType::Datetime)]
    #[case::boolean_from_number(json!(1), shadow::FieldType::Boolean)]
    #[case::array_as_object(json!([1]), shadow::FieldType::Object)]
    #[case::object_as_string(json!({"a": 1}), shadow::FieldType::String)]
    fn test_encode_fails(#[case] value: Value, #[case] field_type: shadow::FieldType) {
        let config = config(3);
        let codec = Codec::new(&config, "createdAt", "updatedAt");
        assert!(codec.encode(&value, field_type).is_err());
    }

    #[test]
    fn test_encode_out_of_range_error() {
        let config = config(3);
        let codec = Codec::new(&config, "createdAt", "updatedAt");
        assert_eq!(
            codec.encode(&json!(1000), shadow::FieldType::Number),
            Err(EncodeError::OutOfRange {
                value: 1000.0,
                padding: 3,
            })
        );
    }

    #[test]
    fn test_encode_padding_past_i64() {
        let config = config(40);
        let codec = Codec::new(&config, "createdAt", "updatedAt");
        assert_eq!(
            codec.encode(&json!(1), shadow::FieldType::Number),
            Err(EncodeError::OutOfRange {
                value: 1.0,
                padding: 40,
            })
        );
    }

    #[test]
    fn test_number_encoding_preserves_order() {
        let config = CodecConfig::default();
        let codec = Codec::new(&config, "createdAt", "updatedAt");
        let limit = 10_f64.powi(config.number_padding as i32);
        let numbers = [
            -limit,
            -limit + 1.0,
            -123_456.0,
            -10.0,
            -2.0,
            -1.0,
            0.0,
            1.0,
            2.0,
            10.0,
            99.0,
            100.0,
            123_456.0,
            limit - 1.0,
        ];
        let encoded: Vec<String> = numbers
            .iter()
            .map(|number| codec.encode(&json!(number), shadow::FieldType::Number).unwrap())
            .collect();
        for pair in encoded.windows(2) {
            assert!(pair[0] < pair[1], "{} >= {}", pair[0], pair[1]);
        }
        assert!(encoded.iter().all(|value| value.len() == 16));
    }

    #[test]
    fn test_legacy_number_encoding() {
        let config = CodecConfig {
            number_padding: 3,
            number_encoding: NumberEncoding::Legacy,
            ..Default::default()
        };
        let codec = Codec::new(&config, "createdAt", "updatedAt");
        assert_eq!(codec.encode(&json!(5), shadow::FieldType::Number).unwrap(), "005");
        assert_eq!(codec.encode(&json!(-5), shadow::FieldType::Number).unwrap(), "000");
        assert!(codec.encode(&json!(1000), shadow::FieldType::Number).is_err());
    }

    #[test]
    fn test_datetime_encoding_preserves_order() {
        let config = CodecConfig::default();
        let codec = Codec::new(&config, "createdAt", "updatedAt");
        let earlier = codec
            .encode(&json!("2024-03-01T23:00:00-05:00"), shadow::FieldType::Datetime)
            .unwrap();
        let later = codec
            .encode(&json!("2024-03-02T03:30:00Z"), shadow::FieldType::Datetime)
            .unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn test_composite_encoding_uses_double_budget() {
        let config = config(3);
        let codec = Codec::new(&config, "createdAt", "updatedAt");
        let encoded = codec
            .encode(&json!(["aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"]), shadow::FieldType::Array)
            .unwrap();
        assert_eq!(encoded.len(), 32);
    }

    #[test]
    fn test_composite_encoding_ignores_insertion_order() {
        let config = config(3);
        let codec = Codec::new(&config, "createdAt", "updatedAt");
        let left = json!({"updatedAt": "u", "b": {"y": 1, "x": 2}, "createdAt": "c", "id": "i"});
        let right = json!({"id": "i", "createdAt": "c", "b": {"x": 2, "y": 1}, "updatedAt": "u"});
        assert_eq!(
            codec.encode(&left, shadow::FieldType::Object).unwrap(),
            codec.encode(&right, shadow::FieldType::Object).unwrap()
        );
    }
}
