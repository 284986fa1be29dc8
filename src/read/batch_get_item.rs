use crate::{common, read};

use aws_sdk_dynamodb::{Client, error, operation, types};
use serde::{Serialize, ser::Error as _};
use serde_dynamo::{Error, Result};
use std::collections;

/// Most keys one batch get request may carry.
pub const MAX_KEYS_PER_REQUEST: usize = 100;

/// Batch get item operation over a single table.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_shadow::{common, read};
/// use serde_json::json;
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let batch_get = read::batch_get_item::BatchGetItem {
///     keys: vec![common::key::Keys::new(
///         common::key::Key::new("pk", json!("tasks")),
///         common::key::Key::new("sk", json!("id#1")),
///     )],
///     single_read_args: read::common::SingleReadArgs {
///         consistent_read: Some(true),
///         table_name: "records".to_string(),
///     },
/// };
/// batch_get.send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchGetItem<T> {
    /// The keys to retrieve, at most [`MAX_KEYS_PER_REQUEST`].
    pub keys: Vec<common::key::Keys<T>>,
    /// The table and read consistency.
    pub single_read_args: read::common::SingleReadArgs,
}

impl<T: Serialize> TryFrom<BatchGetItem<T>> for operation::batch_get_item::BatchGetItemInput {
    type Error = Error;

    fn try_from(batch_get_item: BatchGetItem<T>) -> Result<Self> {
        let single_operation: read::common::SingleReadInput =
            batch_get_item.single_read_args.into();
        let mut serialized_keys = Vec::with_capacity(batch_get_item.keys.len());
        for key in batch_get_item.keys {
            let key = key.try_into()?;
            serialized_keys.push(key);
        }
        let keys_and_attributes = types::KeysAndAttributes::builder()
            .set_consistent_read(single_operation.consistent_read)
            .set_keys(Some(serialized_keys))
            .build()
            .map_err(Error::custom)?;
        let request_items =
            collections::HashMap::from([(single_operation.table_name, keys_and_attributes)]);
        Self::builder()
            .set_request_items(Some(request_items))
            .build()
            .map_err(Error::custom)
    }
}

impl<T: Serialize> BatchGetItem<T> {
    /// Execute one batch get request.
    ///
    /// Keys the store did not process come back in `unprocessed_keys`.
    pub async fn send(
        self,
        client: &Client,
    ) -> Result<
        operation::batch_get_item::BatchGetItemOutput,
        error::SdkError<operation::batch_get_item::BatchGetItemError>,
    > {
        let batch_get_item: operation::batch_get_item::BatchGetItemInput =
            self.try_into().map_err(error::BuildError::other)?;
        client
            .batch_get_item()
            .set_request_items(batch_get_item.request_items)
            .send()
            .await
    }
}
