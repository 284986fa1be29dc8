//! Request building blocks shared by the store reads and writes.
//!
//! Keys and conditions are kept structured until a request is sent, so the
//! same value can be rendered into a DynamoDB expression or evaluated directly.

/// Attribute conditions rendered into key condition and condition expressions.
pub mod condition;

/// Primary keys of stored items.
pub mod key;

use aws_sdk_dynamodb::types;
use std::collections;

/// expression operation
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ExpressionInput {
    pub(crate) expression: String,
    pub(crate) expression_attribute_names: collections::HashMap<String, String>,
    pub(crate) expression_attribute_values: collections::HashMap<String, types::AttributeValue>,
}

impl ExpressionInput {
    pub(crate) fn merge_into(
        self,
        names: &mut Option<collections::HashMap<String, String>>,
        values: &mut Option<collections::HashMap<String, types::AttributeValue>>,
    ) -> String {
        if !self.expression_attribute_names.is_empty() {
            names
                .get_or_insert_with(collections::HashMap::new)
                .extend(self.expression_attribute_names);
        }
        if !self.expression_attribute_values.is_empty() {
            values
                .get_or_insert_with(collections::HashMap::new)
                .extend(self.expression_attribute_values);
        }
        self.expression
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_into() {
        let mut names = None;
        let mut values = Some(collections::HashMap::from([(
            ":a".to_string(),
            types::AttributeValue::S("b".to_string()),
        )]));
        let operation = ExpressionInput {
            expression: "#c = :a".to_string(),
            expression_attribute_names: collections::HashMap::from([(
                "#c".to_string(),
                "c".to_string(),
            )]),
            ..Default::default()
        };
        let expression = operation.merge_into(&mut names, &mut values);
        assert_eq!(expression, "#c = :a");
        assert_eq!(
            names,
            Some(collections::HashMap::from([(
                "#c".to_string(),
                "c".to_string()
            )]))
        );
        assert_eq!(values.map(|values| values.len()), Some(1));
    }
}
