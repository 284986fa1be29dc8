use crate::common;

use aws_sdk_dynamodb::types;
use serde::Serialize;
use serde_dynamo::{Result, to_attribute_value};
use std::collections;

/// Joins the conditions of one expression.
const AND: &str = " AND ";

/// Condition on a single attribute.
///
/// ```rust
/// use dynamodb_shadow::common::condition;
///
/// let prefix: condition::Condition<String> = condition::Condition::BeginsWith("name#".to_string());
/// let missing: condition::Condition<String> = condition::Condition::Null;
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Condition<T> {
    /// The attribute is a string starting with the prefix.
    BeginsWith(String),
    /// The attribute lies between both values, inclusive.
    Between(T, T),
    /// The attribute equals the value.
    Equals(T),
    /// The attribute exists.
    NotNull,
    /// The attribute does not exist.
    Null,
}

impl<T: Serialize> Condition<T> {
    fn get_expression(
        self,
        key: &str,
        key_placeholder: &str,
        index: &mut usize,
    ) -> Result<(String, collections::HashMap<String, types::AttributeValue>)> {
        let mut expression_attribute_values = collections::HashMap::new();
        let expression = match self {
            Self::BeginsWith(prefix) => {
                let value_placeholder = format!(":{}_begins_with{}", key, index);
                *index += 1;
                let expression = format!("begins_with({}, {})", key_placeholder, value_placeholder);
                expression_attribute_values
                    .insert(value_placeholder, types::AttributeValue::S(prefix));
                expression
            }
            Self::Between(value1, value2) => {
                let value1 = to_attribute_value(value1)?;
                let value2 = to_attribute_value(value2)?;
                let value_placeholder_1 = format!(":{}_between{}", key, index);
                *index += 1;
                let value_placeholder_2 = format!(":{}_between{}", key, index);
                *index += 1;
                let expression = format!(
                    "{} BETWEEN {} AND {}",
                    key_placeholder, value_placeholder_1, value_placeholder_2
                );
                expression_attribute_values.insert(value_placeholder_1, value1);
                expression_attribute_values.insert(value_placeholder_2, value2);
                expression
            }
            Self::Equals(value) => {
                let value = to_attribute_value(value)?;
                let value_placeholder = format!(":{}_eq{}", key, index);
                *index += 1;
                let expression = format!("{} = {}", key_placeholder, value_placeholder);
                expression_attribute_values.insert(value_placeholder, value);
                expression
            }
            Self::NotNull => format!("attribute_exists({})", key_placeholder),
            Self::Null => format!("attribute_not_exists({})", key_placeholder),
        };
        Ok((expression, expression_attribute_values))
    }
}

/// Condition applied to an attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyCondition<T> {
    /// The condition to apply to the attribute.
    pub condition: Condition<T>,
    /// The name of the attribute to apply the condition to.
    pub name: String,
}

impl<T> KeyCondition<T> {
    /// `condition` on attribute `name`.
    pub fn new(name: impl Into<String>, condition: Condition<T>) -> Self {
        Self {
            condition,
            name: name.into(),
        }
    }
}

impl<T: Serialize> KeyCondition<T> {
    /// Render `keys` as one expression, joined with AND.
    pub(crate) fn get_expression_operation(keys: Vec<Self>) -> Result<common::ExpressionInput> {
        let mut expressions = Vec::with_capacity(keys.len());
        let mut expression_attribute_names = collections::HashMap::with_capacity(keys.len());
        let mut expression_attribute_values = collections::HashMap::new();
        let mut index = 0;
        for key in keys {
            let placeholder = format!("#{}", key.name);
            let (expression, condition_expression_attribute_values) = key
                .condition
                .get_expression(&key.name, &placeholder, &mut index)?;
            expressions.push(expression);
            expression_attribute_names.insert(placeholder, key.name);
            expression_attribute_values.extend(condition_expression_attribute_values);
        }
        let expression = expressions.join(AND);
        let operation = common::ExpressionInput {
            expression,
            expression_attribute_names,
            expression_attribute_values,
        };
        Ok(operation)
    }
}
