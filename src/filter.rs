//! Filters written as `field`, `field:operator` or `field:operator:type` keys.
//!
//! ```rust
//! use dynamodb_shadow::filter;
//! use serde_json::json;
//!
//! let filters = filter::parse::parse_filters(
//!     json!({"priority:gte:number": 5, "title:starts": "Fix"})
//!         .as_object()
//!         .unwrap(),
//! )
//! .unwrap();
//! let document = json!({"priority": 7, "title": "Fix the build"});
//! assert!(filter::matcher::matches_all(&document, &filters));
//! ```

/// Evaluation of filters against documents.
pub mod matcher;

/// Parsing of filter keys and values.
pub mod parse;

use crate::{
    error::{Error, Result},
    shadow,
};

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::{cmp, str};

/// Comparison operator.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Operator {
    /// Equal.
    #[default]
    Eq,
    /// Strictly less.
    Lt,
    /// Less or equal.
    Lte,
    /// Strictly greater.
    Gt,
    /// Greater or equal.
    Gte,
    /// Text starts with.
    Starts,
    /// Text ends with.
    Ends,
}

impl Operator {
    /// Whether the operator can narrow a sort key range.
    pub fn is_range_capable(self) -> bool {
        !matches!(self, Self::Ends)
    }
}

impl str::FromStr for Operator {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "eq" => Ok(Self::Eq),
            "lt" => Ok(Self::Lt),
            "lte" => Ok(Self::Lte),
            "gt" => Ok(Self::Gt),
            "gte" => Ok(Self::Gte),
            "starts" => Ok(Self::Starts),
            "ends" => Ok(Self::Ends),
            _ => Err(Error::InvalidFilter(format!("unknown operator {value:?}"))),
        }
    }
}

/// Type both sides of a comparison are coerced to.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ValueType {
    /// Text.
    #[default]
    String,
    /// Number.
    Number,
    /// Point in time.
    Date,
    /// Boolean.
    Boolean,
}

impl ValueType {
    /// Shadow encoding matching this type.
    pub fn field_type(self) -> shadow::FieldType {
        match self {
            Self::String => shadow::FieldType::String,
            Self::Number => shadow::FieldType::Number,
            Self::Date => shadow::FieldType::Datetime,
            Self::Boolean => shadow::FieldType::Boolean,
        }
    }
}

impl str::FromStr for ValueType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "date" => Ok(Self::Date),
            "boolean" => Ok(Self::Boolean),
            _ => Err(Error::InvalidFilter(format!("unknown filter type {value:?}"))),
        }
    }
}

/// A value after coercion to a [`ValueType`].
#[derive(Clone, Debug, PartialEq)]
pub enum Coerced {
    /// Text.
    String(String),
    /// Number.
    Number(f64),
    /// Point in time.
    Date(DateTime<Utc>),
    /// Boolean.
    Boolean(bool),
}

impl PartialOrd for Coerced {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        match (self, other) {
            (Self::String(left), Self::String(right)) => left.partial_cmp(right),
            (Self::Number(left), Self::Number(right)) => left.partial_cmp(right),
            (Self::Date(left), Self::Date(right)) => left.partial_cmp(right),
            (Self::Boolean(left), Self::Boolean(right)) => left.partial_cmp(right),
            _ => None,
        }
    }
}

/// One parsed filter.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    /// Document field; dots address nested fields.
    pub field: String,
    /// Comparison operator.
    pub operator: Operator,
    /// Coercion type.
    pub value_type: ValueType,
    /// Whether the type was written in the key rather than defaulted.
    pub explicit_type: bool,
    /// Raw filter value.
    pub value: Value,
    /// Filter value coerced to `value_type`.
    pub coerced: Coerced,
}
