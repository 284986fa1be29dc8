use aws_sdk_dynamodb::types;
use serde::Serialize;
use serde_dynamo::{Error, Result, to_attribute_value};
use serde_json::{Map, Value};
use std::collections;

/// Key component.
///
/// ```rust
/// use dynamodb_shadow::common::key;
///
/// let key = key::Key::new("pk", "tasks".to_string());
/// assert_eq!(key.name, "pk");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Key<T> {
    /// The attribute name of the key.
    pub name: String,
    /// The value of the key.
    pub value: T,
}

impl<T> Key<T> {
    /// Key component `name = value`.
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Primary key (partition key and optional sort key).
///
/// ```rust
/// use dynamodb_shadow::common::key;
/// use serde_json::json;
///
/// let keys = key::Keys::new(
///     key::Key::new("pk", json!("tasks")),
///     key::Key::new("sk", json!("id#1")),
/// );
/// assert_eq!(keys.to_item(), json!({"pk": "tasks", "sk": "id#1"}).as_object().unwrap().clone());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Keys<T> {
    /// The partition key (required).
    pub partition_key: Key<T>,
    /// The sort key (optional, only for tables with composite primary keys).
    pub sort_key: Option<Key<T>>,
}

impl<T> Keys<T> {
    /// Composite key.
    pub fn new(partition_key: Key<T>, sort_key: Key<T>) -> Self {
        Self {
            partition_key,
            sort_key: Some(sort_key),
        }
    }
}

impl Keys<Value> {
    /// The key attributes as an item.
    pub fn to_item(&self) -> Map<String, Value> {
        let mut item = Map::new();
        item.insert(
            self.partition_key.name.clone(),
            self.partition_key.value.clone(),
        );
        if let Some(sort_key) = &self.sort_key {
            item.insert(sort_key.name.clone(), sort_key.value.clone());
        }
        item
    }
}

impl<T: Serialize> TryFrom<Keys<T>> for collections::HashMap<String, types::AttributeValue> {
    type Error = Error;

    fn try_from(key: Keys<T>) -> Result<Self> {
        let partition_key_value = to_attribute_value(key.partition_key.value)?;
        let mut keys = Self::from([(key.partition_key.name, partition_key_value)]);
        if let Some(sort_key) = key.sort_key {
            let sort_key_value = to_attribute_value(sort_key.value)?;
            keys.insert(sort_key.name, sort_key_value);
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case::partition_key_only(
        Keys {
            partition_key: Key {
                name: "pk".to_string(),
                value: Value::String(
                    "tasks".to_string()
                ),
            },
            ..Default::default()
        },
        collections::HashMap::from(
            [(
                "pk".to_string(),
                types::AttributeValue::S(
                    "tasks".to_string()
                ),
            )]
        )
    )]
    #[case::main_record(
        Keys {
            partition_key: Key {
                name: "pk".to_string(),
                value: Value::String(
                    "tasks".to_string()
                ),
            },
            sort_key: Some(
                Key {
                    name: "sk".to_string(),
                    value: Value::String(
                        "id#1".to_string()
                    ),
                }
            ),
        },
        collections::HashMap::from(
            [
                (
                    "pk".to_string(),
                    types::AttributeValue::S(
                        "tasks".to_string()
                    )
                ),
                (
                    "sk".to_string(),
                    types::AttributeValue::S(
                        "id#1".to_string()
                    )
                ),
            ]
        )
    )]
    #[case::number_sort_key(
        Keys {
            partition_key: Key {
                name: "a".to_string(),
                value: Value::String(
                    "b".to_string()
                ),
            },
            sort_key: Some(
                Key {
                    name: "c".to_string(),
                    value: Value::Number(
                        100.into()
                    ),
                }
            ),
        },
        collections::HashMap::from(
            [
                (
                    "a".to_string(),
                    types::AttributeValue::S(
                        "b".to_string()
                    )
                ),
                (
                    "c".to_string(),
                    types::AttributeValue::N(
                        "100".to_string()
                    )
                ),
            ]
        )
    )]
    fn test_keys_to_hash_map(
        #[case] keys: Keys<Value>,
        #[case] expected: collections::HashMap<String, types::AttributeValue>,
    ) {
        let actual: collections::HashMap<String, types::AttributeValue> = keys.try_into().unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_keys_to_item() {
        let keys = Keys::new(Key::new("pk", json!("tasks")), Key::new("sk", json!("name#a#id#1")));
        assert_eq!(
            keys.to_item(),
            json!({"pk": "tasks", "sk": "name#a#id#1"}).as_object().unwrap().clone()
        );
    }
}
