//! Engine configuration.
//!
//! [`Config::from_env`] reads the process environment; every value except
//! `TABLE_NAME` has a default.

use crate::{
    error::{Error, Result},
    shadow,
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{env, str, time};

/// Prefix reserved for internal attributes; such fields are never shadowed or returned.
pub const INTERNAL_PREFIX: &str = "__";

/// Hard ceiling of items in one store transaction.
pub const MAX_TRANSACTION_ITEMS: usize = 100;

/// Largest number padding whose offset values stay exact in an `f64`.
pub const MAX_NUMBER_PADDING: u32 = 15;

/// Store limit for the byte length of a sort key.
const MAX_SORT_KEY_BYTES: usize = 1024;

/// Bytes reserved in a shadow key for the field name, separators and id.
const SHADOW_KEY_OVERHEAD_BYTES: usize = 128;

/// Sort direction.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending.
    #[default]
    #[serde(alias = "ASC")]
    Asc,
    /// Descending.
    #[serde(alias = "DESC")]
    Desc,
}

impl str::FromStr for SortOrder {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(Error::Validation(format!("unknown sort order {value:?}"))),
        }
    }
}

/// Field and direction to sort by.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct SortSpec {
    /// Document field; `id` sorts by the primary key itself.
    pub field: String,
    /// Direction.
    #[serde(default)]
    pub order: SortOrder,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: shadow::ID_FIELD.to_string(),
            order: SortOrder::default(),
        }
    }
}

/// Number encoding scheme of shadow keys.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberEncoding {
    /// `floor(value) + 10^padding`, zero-padded to `padding + 1` digits.
    #[default]
    Offset,
    /// Negatives clamp to zero, zero-padded to `padding` digits.
    Legacy,
}

impl str::FromStr for NumberEncoding {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "offset" => Ok(Self::Offset),
            "legacy" => Ok(Self::Legacy),
            _ => Err(Error::Config(format!("unknown number encoding {value:?}"))),
        }
    }
}

/// Shadow key codec settings.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CodecConfig {
    /// Byte budget of an encoded string value; arrays and objects get twice this.
    pub max_bytes: usize,
    /// Number of digits of the number encoding.
    pub number_padding: u32,
    /// Number encoding scheme.
    pub number_encoding: NumberEncoding,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_bytes: 256,
            number_padding: MAX_NUMBER_PADDING,
            number_encoding: NumberEncoding::default(),
        }
    }
}

/// Per-resource settings.
///
/// ```rust
/// use dynamodb_shadow::config;
///
/// let resource: config::ResourceConfig = serde_json::from_str(
///     r#"{"sort": {"field": "priority", "order": "desc"}, "schema": {"priority": "number"}}"#,
/// )
/// .unwrap();
/// assert_eq!(resource.sort.order, config::SortOrder::Desc);
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResourceConfig {
    /// Sort applied when a find does not name one.
    #[serde(default)]
    pub sort: SortSpec,
    /// Declared field types; when present only these fields are shadowed.
    #[serde(default)]
    pub schema: Option<IndexMap<String, shadow::FieldType>>,
    /// Records expire this many days after creation.
    #[serde(default)]
    pub retention_days: Option<u32>,
}

impl ResourceConfig {
    /// Declared type of `field`, if a schema is present and names it.
    pub fn declared_type(&self, field: &str) -> Option<shadow::FieldType> {
        self.schema
            .as_ref()
            .and_then(|schema| schema.get(field).copied())
    }

    /// Whether `field` may be used to sort or filter this resource.
    pub fn is_known_field(&self, field: &str) -> bool {
        let top_level = field.split('.').next().unwrap_or(field);
        match &self.schema {
            Some(schema) => field == shadow::ID_FIELD || schema.contains_key(top_level),
            None => true,
        }
    }
}

/// Engine configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Table holding every resource.
    pub table_name: String,
    /// Attribute name of the partition key.
    pub partition_key_name: String,
    /// Attribute name of the sort key.
    pub sort_key_name: String,
    /// Document field stamped at creation.
    pub created_at_field: String,
    /// Document field stamped at every write.
    pub updated_at_field: String,
    /// Shadow key codec settings.
    pub codec: CodecConfig,
    /// Item ceiling of one transaction.
    pub max_transaction_items: usize,
    /// Page size used when a find does not name one.
    pub default_page_size: usize,
    /// Largest page size a find may request.
    pub max_page_size: usize,
    /// Deadline of every store call.
    pub store_timeout: time::Duration,
    /// Chunk transactions of a bulk call in flight at once.
    pub chunk_concurrency: usize,
    /// Known resources; when empty every resource name is accepted with defaults.
    pub resources: IndexMap<String, ResourceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            table_name: String::new(),
            partition_key_name: "pk".to_string(),
            sort_key_name: "sk".to_string(),
            created_at_field: "createdAt".to_string(),
            updated_at_field: "updatedAt".to_string(),
            codec: CodecConfig::default(),
            max_transaction_items: MAX_TRANSACTION_ITEMS,
            default_page_size: 25,
            max_page_size: 100,
            store_timeout: time::Duration::from_secs(10),
            chunk_concurrency: 1,
            resources: IndexMap::new(),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: str::FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{name}: invalid value {raw:?}"))),
        None => Ok(default),
    }
}

impl Config {
    /// Configuration for `table_name` with every other setting defaulted.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Default::default()
        }
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read the configuration from `lookup`, which maps variable names to values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let table_name = lookup("TABLE_NAME")
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| Error::Config("TABLE_NAME is not set".to_string()))?;
        let resources = match lookup("RESOURCES") {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|err| Error::Config(format!("RESOURCES: {err}")))?,
            None => IndexMap::new(),
        };
        let number_encoding = match lookup("SHADOW_NUMBER_ENCODING") {
            Some(raw) => raw.parse()?,
            None => defaults.codec.number_encoding,
        };
        let store_timeout_ms = parse_or(
            &lookup,
            "STORE_TIMEOUT_MS",
            defaults.store_timeout.as_millis() as u64,
        )?;
        let config = Self {
            table_name,
            partition_key_name: lookup("PARTITION_KEY_NAME").unwrap_or(defaults.partition_key_name),
            sort_key_name: lookup("SORT_KEY_NAME").unwrap_or(defaults.sort_key_name),
            created_at_field: lookup("CREATED_AT_FIELD").unwrap_or(defaults.created_at_field),
            updated_at_field: lookup("UPDATED_AT_FIELD").unwrap_or(defaults.updated_at_field),
            codec: CodecConfig {
                max_bytes: parse_or(&lookup, "SHADOW_MAX_BYTES", defaults.codec.max_bytes)?,
                number_padding: parse_or(
                    &lookup,
                    "SHADOW_NUMBER_PADDING",
                    defaults.codec.number_padding,
                )?,
                number_encoding,
            },
            max_transaction_items: parse_or(
                &lookup,
                "MAX_TRANSACTION_ITEMS",
                defaults.max_transaction_items,
            )?,
            default_page_size: parse_or(&lookup, "DEFAULT_PAGE_SIZE", defaults.default_page_size)?,
            max_page_size: parse_or(&lookup, "MAX_PAGE_SIZE", defaults.max_page_size)?,
            store_timeout: time::Duration::from_millis(store_timeout_ms),
            chunk_concurrency: parse_or(&lookup, "CHUNK_CONCURRENCY", defaults.chunk_concurrency)?,
            resources,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        let fail = |message: String| Err(Error::Config(message));
        if self.table_name.trim().is_empty() {
            return fail("table name is empty".to_string());
        }
        if self.partition_key_name.is_empty()
            || self.sort_key_name.is_empty()
            || self.partition_key_name == self.sort_key_name
        {
            return fail("partition and sort key names must be distinct and non-empty".to_string());
        }
        for field in [&self.created_at_field, &self.updated_at_field] {
            if field.is_empty() || field == shadow::ID_FIELD || field.starts_with(INTERNAL_PREFIX) {
                return fail(format!("invalid timestamp field {field:?}"));
            }
        }
        if self.created_at_field == self.updated_at_field {
            return fail("timestamp fields must be distinct".to_string());
        }
        if self.codec.max_bytes == 0
            || 2 * self.codec.max_bytes + SHADOW_KEY_OVERHEAD_BYTES > MAX_SORT_KEY_BYTES
        {
            return fail(format!(
                "shadow max bytes must be between 1 and {}",
                (MAX_SORT_KEY_BYTES - SHADOW_KEY_OVERHEAD_BYTES) / 2
            ));
        }
        if !(1..=MAX_NUMBER_PADDING).contains(&self.codec.number_padding) {
            return fail(format!(
                "number padding must be between 1 and {MAX_NUMBER_PADDING}"
            ));
        }
        if !(1..=MAX_TRANSACTION_ITEMS).contains(&self.max_transaction_items) {
            return fail(format!(
                "max transaction items must be between 1 and {MAX_TRANSACTION_ITEMS}"
            ));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return fail("default page size must be between 1 and the max page size".to_string());
        }
        if self.chunk_concurrency == 0 {
            return fail("chunk concurrency must be at least 1".to_string());
        }
        if self.store_timeout.is_zero() {
            return fail("store timeout must be positive".to_string());
        }
        for (name, resource) in &self.resources {
            if name.is_empty() {
                return fail("resource names must be non-empty".to_string());
            }
            if let Some(schema) = &resource.schema {
                for field in schema.keys() {
                    if !shadow::is_shadowable_field(field) {
                        return fail(format!("{name}: field {field:?} cannot be shadowed"));
                    }
                }
            }
            if !resource.is_known_field(&resource.sort.field) {
                return fail(format!(
                    "{name}: default sort field {:?} is not in the schema",
                    resource.sort.field
                ));
            }
        }
        Ok(())
    }

    /// Settings of `resource`.
    pub fn resource(&self, resource: &str) -> Result<ResourceConfig> {
        if resource.is_empty() {
            return Err(Error::Validation("resource name is empty".to_string()));
        }
        if self.resources.is_empty() {
            return Ok(ResourceConfig::default());
        }
        self.resources
            .get(resource)
            .cloned()
            .ok_or_else(|| Error::Validation(format!("unknown resource {resource:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use std::collections;

    fn lookup(
        pairs: &[(&str, &str)],
    ) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: collections::HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = Config::from_lookup(lookup(&[("TABLE_NAME", "a")])).unwrap();
        assert_eq!(config, Config::new("a"));
    }

    #[test]
    fn test_from_lookup_full() {
        let config = Config::from_lookup(lookup(&[
            ("TABLE_NAME", "a"),
            ("PARTITION_KEY_NAME", "b"),
            ("SORT_KEY_NAME", "c"),
            ("CREATED_AT_FIELD", "d"),
            ("UPDATED_AT_FIELD", "e"),
            ("SHADOW_MAX_BYTES", "100"),
            ("SHADOW_NUMBER_PADDING", "10"),
            ("SHADOW_NUMBER_ENCODING", "legacy"),
            ("MAX_TRANSACTION_ITEMS", "25"),
            ("DEFAULT_PAGE_SIZE", "10"),
            ("MAX_PAGE_SIZE", "50"),
            ("STORE_TIMEOUT_MS", "1500"),
            ("CHUNK_CONCURRENCY", "4"),
            (
                "RESOURCES",
                r#"{"tasks": {"sort": {"field": "priority", "order": "desc"}, "schema": {"priority": "number"}, "retentionDays": 7}}"#,
            ),
        ]))
        .unwrap();
        let expected = Config {
            table_name: "a".to_string(),
            partition_key_name: "b".to_string(),
            sort_key_name: "c".to_string(),
            created_at_field: "d".to_string(),
            updated_at_field: "e".to_string(),
            codec: CodecConfig {
                max_bytes: 100,
                number_padding: 10,
                number_encoding: NumberEncoding::Legacy,
            },
            max_transaction_items: 25,
            default_page_size: 10,
            max_page_size: 50,
            store_timeout: time::Duration::from_millis(1500),
            chunk_concurrency: 4,
            resources: IndexMap::from([(
                "tasks".to_string(),
                ResourceConfig {
                    sort: SortSpec {
                        field: "priority".to_string(),
                        order: SortOrder::Desc,
                    },
                    schema: Some(IndexMap::from([(
                        "priority".to_string(),
                        shadow::FieldType::Number,
                    )])),
                    retention_days: Some(7),
                },
            )]),
        };
        assert_eq!(config, expected);
    }

    #[rstest]
    #[case::missing_table(&[])]
    #[case::blank_table(&[("TABLE_NAME", " ")])]
    #[case::bad_number(&[("TABLE_NAME", "a"), ("MAX_PAGE_SIZE", "many")])]
    #[case::ceiling_too_high(&[("TABLE_NAME", "a"), ("MAX_TRANSACTION_ITEMS", "101")])]
    #[case::padding_too_wide(&[("TABLE_NAME", "a"), ("SHADOW_NUMBER_PADDING", "16")])]
    #[case::budget_too_large(&[("TABLE_NAME", "a"), ("SHADOW_MAX_BYTES", "1000")])]
    #[case::unknown_encoding(&[("TABLE_NAME", "a"), ("SHADOW_NUMBER_ENCODING", "roman")])]
    #[case::page_size_above_max(&[("TABLE_NAME", "a"), ("DEFAULT_PAGE_SIZE", "200")])]
    #[case::same_key_names(&[("TABLE_NAME", "a"), ("SORT_KEY_NAME", "pk")])]
    #[case::bad_resources(&[("TABLE_NAME", "a"), ("RESOURCES", "[1]")])]
    #[case::sort_outside_schema(&[
        ("TABLE_NAME", "a"),
        ("RESOURCES", r#"{"tasks": {"sort": {"field": "title"}, "schema": {"priority": "number"}}}"#),
    ])]
    #[case::unknown_schema_type(&[
        ("TABLE_NAME", "a"),
        ("RESOURCES", r#"{"tasks": {"schema": {"priority": "decimal"}}}"#),
    ])]
    fn test_from_lookup_config_error(#[case] pairs: &[(&str, &str)]) {
        let err = Config::from_lookup(lookup(pairs)).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{err:?}");
    }

    #[test]
    fn test_resource_lookup() {
        let mut config = Config::new("a");
        assert_eq!(config.resource("tasks").unwrap(), ResourceConfig::default());
        config
            .resources
            .insert("tasks".to_string(), ResourceConfig::default());
        assert!(config.resource("tasks").is_ok());
        assert!(matches!(
            config.resource("users"),
            Err(Error::Validation(_))
        ));
    }
}
