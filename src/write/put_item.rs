use crate::write;

use aws_sdk_dynamodb::types;
use serde::{Serialize, ser::Error as _};
use serde_dynamo::{Error, Result, to_item};
use std::collections;

/// put item operation
#[derive(Debug, PartialEq)]
struct PutItemInput {
    item: collections::HashMap<String, types::AttributeValue>,
    write_operation: write::common::WriteInput,
}

/// Put item operation.
///
/// ```rust
/// use aws_sdk_dynamodb::types;
/// use dynamodb_shadow::{common, write};
/// use serde_json::json;
///
/// let put_item = write::put_item::PutItem {
///     item: json!({"pk": "tasks", "sk": "id#1", "id": "1", "title": "a"}),
///     write_args: write::common::WriteArgs {
///         conditions: vec![common::condition::KeyCondition::new(
///             "sk",
///             common::condition::Condition::Null,
///         )],
///         table_name: "records".to_string(),
///         ..Default::default()
///     },
/// };
/// let put: types::Put = put_item.try_into().unwrap();
/// assert_eq!(put.condition_expression(), Some("attribute_not_exists(#sk)"));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PutItem<T> {
    /// The item to put into the table.
    pub item: T,
    /// Additional write operation arguments (table name, conditions).
    pub write_args: write::common::WriteArgs<T>,
}

impl<T: Serialize> TryFrom<PutItem<T>> for PutItemInput {
    type Error = Error;

    fn try_from(put_item: PutItem<T>) -> Result<Self> {
        let item = to_item(put_item.item)?;
        let write_operation: write::common::WriteInput = put_item.write_args.try_into()?;
        let operation = Self {
            item,
            write_operation,
        };
        Ok(operation)
    }
}

impl<T: Serialize> TryFrom<PutItem<T>> for types::Put {
    type Error = Error;

    fn try_from(put_item: PutItem<T>) -> Result<Self> {
        let put_item: PutItemInput = put_item.try_into()?;
        let builder = Self::builder().set_item(Some(put_item.item));
        crate::apply_write_operation!(builder, put_item.write_operation)
            .build()
            .map_err(Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common;

    use rstest::rstest;
    use serde_json::{Value, json};

    #[rstest]
    #[case::unconditional(
        PutItem {
            item: json!(
                {
                    "pk": "tasks",
                    "sk": "title#a#id#1",
                    "id": "1"
                }
            ),
            write_args: write::common::WriteArgs {
                table_name: "c".to_string(),
                ..Default::default()
            },
        },
        PutItemInput {
            item: collections::HashMap::from(
                [
                    (
                        "pk".to_string(),
                        types::AttributeValue::S(
                            "tasks".to_string()
                        ),
                    ),
                    (
                        "sk".to_string(),
                        types::AttributeValue::S(
                            "title#a#id#1".to_string()
                        ),
                    ),
                    (
                        "id".to_string(),
                        types::AttributeValue::S(
                            "1".to_string()
                        ),
                    ),
                ]
            ),
            write_operation: write::common::WriteInput {
                table_name: "c".to_string(),
                ..Default::default()
            },
        }
    )]
    #[case::versioned(
        PutItem {
            item: json!(
                {
                    "a": "b"
                }
            ),
            write_args: write::common::WriteArgs {
                conditions: vec![
                    common::condition::KeyCondition {
                        name: "__version".to_string(),
                        condition: common::condition::Condition::Equals(
                            Value::Number(
                                2.into()
                            )
                        ),
                    },
                ],
                return_values_on_condition_check_failure: Some(
                    types::ReturnValuesOnConditionCheckFailure::AllOld
                ),
                table_name: "e".to_string(),
            },
        },
        PutItemInput {
            item: collections::HashMap::from(
                [(
                    "a".to_string(),
                    types::AttributeValue::S(
                        "b".to_string()
                    ),
                )]
            ),
            write_operation: write::common::WriteInput {
                condition_expression: Some(
                    "#__version = :__version_eq0".to_string()
                ),
                expression_attribute_names: Some(
                    collections::HashMap::from(
                        [
                            ("#__version".to_string(), "__version".to_string()),
                        ]
                    )
                ),
                expression_attribute_values: Some(
                    collections::HashMap::from(
                        [
                            (
                                ":__version_eq0".to_string(),
                                types::AttributeValue::N(
                                    "2".to_string()
                                )
                            ),
                        ]
                    )
                ),
                return_values_on_condition_check_failure: Some(
                    types::ReturnValuesOnConditionCheckFailure::AllOld
                ),
                table_name: "e".to_string(),
            },
        }
    )]
    fn test_put_item(#[case] args: PutItem<Value>, #[case] expected: PutItemInput) {
        let actual: PutItemInput = args.try_into().unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_put_item_rejects_non_object() {
        let put_item = PutItem {
            item: json!("not an item"),
            write_args: write::common::WriteArgs {
                table_name: "a".to_string(),
                ..Default::default()
            },
        };
        let put: Result<types::Put> = put_item.try_into();
        assert!(put.is_err());
    }
}
