use crate::common;

use aws_sdk_dynamodb::types;
use serde::Serialize;
use serde_dynamo::{Error, Result};
use std::collections;

/// Internal representation of write operation parameters.
///
/// Holds the resolved condition expression and attribute mappings of a
/// [`WriteArgs`], ready for the DynamoDB request builders.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct WriteInput {
    pub(crate) condition_expression: Option<String>,
    pub(crate) expression_attribute_names: Option<collections::HashMap<String, String>>,
    pub(crate) expression_attribute_values:
        Option<collections::HashMap<String, types::AttributeValue>>,
    pub(crate) return_values_on_condition_check_failure:
        Option<types::ReturnValuesOnConditionCheckFailure>,
    pub(crate) table_name: String,
}

/// Arguments common to all write operations (Put, Delete).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteArgs<T> {
    /// Conditions that must all hold for the write to apply.
    ///
    /// A failing condition cancels the whole transaction.
    pub conditions: Vec<common::condition::KeyCondition<T>>,
    /// Which item attributes to return if a condition check fails.
    pub return_values_on_condition_check_failure:
        Option<types::ReturnValuesOnConditionCheckFailure>,
    /// The name of the table to write to.
    pub table_name: String,
}

impl<T: Serialize> TryFrom<WriteArgs<T>> for WriteInput {
    type Error = Error;

    fn try_from(write_args: WriteArgs<T>) -> Result<Self> {
        let mut operation = Self {
            return_values_on_condition_check_failure: write_args
                .return_values_on_condition_check_failure,
            table_name: write_args.table_name,
            ..Default::default()
        };
        if !write_args.conditions.is_empty() {
            let condition_operation =
                common::condition::KeyCondition::get_expression_operation(write_args.conditions)?;
            let condition_expression = condition_operation.merge_into(
                &mut operation.expression_attribute_names,
                &mut operation.expression_attribute_values,
            );
            operation.condition_expression = Some(condition_expression);
        }
        Ok(operation)
    }
}

/// apply common write operation settings to a builder
#[macro_export]
macro_rules! apply_write_operation {
    ($builder:expr, $write_operation:expr) => {
        $builder
            .set_condition_expression($write_operation.condition_expression)
            .set_expression_attribute_names($write_operation.expression_attribute_names)
            .set_expression_attribute_values($write_operation.expression_attribute_values)
            .set_return_values_on_condition_check_failure(
                $write_operation.return_values_on_condition_check_failure,
            )
            .table_name($write_operation.table_name)
    };
}
