use crate::{common, read};

use aws_sdk_dynamodb::{Client, error, operation};
use serde::Serialize;
use serde_dynamo::{Error, Result};

/// query operation
#[derive(Clone, Debug, Default, PartialEq)]
struct QueryInput {
    key_condition_expression: String,
    multiple_read_operation: read::common::MultipleReadInput,
    scan_index_forward: Option<bool>,
}

/// Query operation reading a single page of a partition.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_shadow::{common, read};
/// use serde_json::json;
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let query = read::query::Query {
///     partition_key: common::key::Key::new("pk", json!("tasks")),
///     sort_key_condition: Some(common::condition::KeyCondition::new(
///         "sk",
///         common::condition::Condition::BeginsWith("id#".to_string()),
///     )),
///     multiple_read_args: read::common::MultipleReadArgs {
///         limit: Some(25),
///         table_name: "records".to_string(),
///         ..Default::default()
///     },
///     ..Default::default()
/// };
/// let page = query.send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query<T> {
    /// Additional read operation arguments (table name, limit, start key, etc.).
    pub multiple_read_args: read::common::MultipleReadArgs<T>,
    /// The partition key value to query for.
    pub partition_key: common::key::Key<T>,
    /// Whether to scan the index forward (ascending) or backward (descending).
    pub scan_index_forward: Option<bool>,
    /// Optional condition to apply to the sort key.
    pub sort_key_condition: Option<common::condition::KeyCondition<T>>,
}

impl<T: Serialize> Query<T> {
    fn get_key_condition_expression(
        partition_key: common::key::Key<T>,
        sort_key: Option<common::condition::KeyCondition<T>>,
    ) -> Result<common::ExpressionInput> {
        let condition = common::condition::Condition::Equals(partition_key.value);
        let partition_key = common::condition::KeyCondition {
            condition,
            name: partition_key.name,
        };
        let mut keys = vec![partition_key];
        if let Some(sort_key) = sort_key {
            keys.push(sort_key);
        }
        common::condition::KeyCondition::get_expression_operation(keys)
    }
}

impl<T: Serialize> TryFrom<Query<T>> for QueryInput {
    type Error = Error;

    fn try_from(query: Query<T>) -> Result<Self> {
        let mut multiple_read_operation: read::common::MultipleReadInput =
            query.multiple_read_args.try_into()?;
        let key_condition_operation =
            Query::get_key_condition_expression(query.partition_key, query.sort_key_condition)?;
        let key_condition_expression = key_condition_operation.merge_into(
            &mut multiple_read_operation.expression_attribute_names,
            &mut multiple_read_operation.expression_attribute_values,
        );
        let operation = Self {
            key_condition_expression,
            multiple_read_operation,
            scan_index_forward: query.scan_index_forward,
        };
        Ok(operation)
    }
}

impl<T: Serialize> Query<T> {
    /// Execute the query, returning one page.
    ///
    /// The page ends at `limit` items or the store's size cap; its
    /// `last_evaluated_key` is set when more rows may follow.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_shadow.query", skip_all, err)
    )]
    pub async fn send(
        self,
        client: &Client,
    ) -> Result<operation::query::QueryOutput, error::SdkError<operation::query::QueryError>> {
        let query: QueryInput = self.try_into().map_err(error::BuildError::other)?;
        let builder = client
            .query()
            .key_condition_expression(query.key_condition_expression)
            .set_scan_index_forward(query.scan_index_forward);
        crate::apply_multiple_read_operation!(builder, query.multiple_read_operation)
            .send()
            .await
    }
}
