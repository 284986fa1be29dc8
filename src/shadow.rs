//! Shadow keys: secondary-index entries encoded into the table's sort key space.
//!
//! Every sortable field of a document gets one shadow record whose sort key is
//! `<field>#<encoded-value>#id#<id>`, so the store's native sort order doubles as
//! an index on `<field>`.

/// Typed value to sortable string encoding.
pub mod codec;

/// Set difference between old and new shadow keys.
pub mod diff;

/// Runtime type inference of field values.
pub mod inference;

/// Sort key layout of main and shadow records.
pub mod key;

/// Canonical field order of composite values.
pub mod normalize;

use crate::{
    config::{self, ResourceConfig},
    error::{Error, Result},
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{collections, str};

/// The document identifier field.
pub const ID_FIELD: &str = "id";

/// Separator between the segments of a sort key.
pub const SEPARATOR: char = '#';

/// Logical type a field value is encoded as.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Escaped, truncated text.
    String,
    /// Fixed-width offset decimal.
    Number,
    /// `1` or `0`.
    Boolean,
    /// ISO-8601 UTC with milliseconds.
    Datetime,
    /// Normalized JSON array.
    Array,
    /// Normalized JSON object.
    Object,
}

impl str::FromStr for FieldType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "datetime" => Ok(Self::Datetime),
            "array" => Ok(Self::Array),
            "object" => Ok(Self::Object),
            _ => Err(Error::Config(format!("unknown field type {value:?}"))),
        }
    }
}

/// Whether `field` can own shadow records.
///
/// `id` is already indexed by the main key, internal fields are bookkeeping, and a
/// separator in the name would make the field's key prefix ambiguous.
pub fn is_shadowable_field(field: &str) -> bool {
    !field.is_empty()
        && field != ID_FIELD
        && !field.starts_with(config::INTERNAL_PREFIX)
        && !field.contains(SEPARATOR)
}

/// Full shadow key set of `document`.
///
/// With a declared schema only declared fields are shadowed, and a missing or null
/// declared field gets the empty encoding. Without one, types are inferred and
/// fields without a type are skipped.
pub fn document_keys(
    document: &Map<String, Value>,
    id: &str,
    resource: &ResourceConfig,
    codec: &codec::Codec<'_>,
) -> Result<collections::BTreeSet<String>> {
    let mut keys = collections::BTreeSet::new();
    let mut push = |field: &str, value: &Value, field_type: FieldType| -> Result<()> {
        let encoded = codec
            .encode(value, field_type)
            .map_err(|err| Error::Validation(format!("field {field:?}: {err}")))?;
        keys.insert(key::shadow_key(field, &encoded, id));
        Ok(())
    };
    match &resource.schema {
        Some(schema) => {
            for (field, field_type) in schema {
                let value = document.get(field).unwrap_or(&Value::Null);
                push(field, value, *field_type)?;
            }
        }
        None => {
            for (field, value) in document {
                if let Some(field_type) = inference::infer_field(field, value) {
                    push(field, value, field_type)?;
                }
            }
        }
    }
    Ok(keys)
}
