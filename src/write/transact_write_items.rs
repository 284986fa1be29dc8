use crate::write;

use aws_sdk_dynamodb::{Client, error, operation, types};
use serde::Serialize;
use serde_dynamo::{Error, Result};

/// Most items one transaction may carry.
pub const MAX_TRANSACT_ITEMS: usize = 100;

/// A single write within a transaction.
#[derive(Clone, Debug, PartialEq)]
pub enum TransactWriteItem<T> {
    /// Creates or replaces an item.
    Put(write::put_item::PutItem<T>),
    /// Removes an item by its primary key.
    Delete(write::delete_item::DeleteItem<T>),
}

impl<T: Serialize> TryFrom<TransactWriteItem<T>> for types::TransactWriteItem {
    type Error = Error;

    fn try_from(transact_write_item: TransactWriteItem<T>) -> Result<Self> {
        let builder = match transact_write_item {
            TransactWriteItem::Put(put_item) => Self::builder().put(put_item.try_into()?),
            TransactWriteItem::Delete(delete_item) => {
                Self::builder().delete(delete_item.try_into()?)
            }
        };
        Ok(builder.build())
    }
}

/// Transaction of puts and deletes applied all-or-nothing.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_shadow::{common, write};
/// use serde_json::json;
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let transaction = write::transact_write_items::TransactWriteItems {
///     items: vec![
///         write::transact_write_items::TransactWriteItem::Put(write::put_item::PutItem {
///             item: json!({"pk": "tasks", "sk": "title#a#id#1", "id": "1"}),
///             write_args: write::common::WriteArgs {
///                 table_name: "records".to_string(),
///                 ..Default::default()
///             },
///         }),
///     ],
/// };
/// transaction.send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransactWriteItems<T> {
    /// The writes, at most [`MAX_TRANSACT_ITEMS`].
    pub items: Vec<TransactWriteItem<T>>,
}

impl<T> TransactWriteItems<T> {
    /// Number of writes.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the transaction carries no writes.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Serialize> TryFrom<TransactWriteItems<T>> for Vec<types::TransactWriteItem> {
    type Error = Error;

    fn try_from(transact_write_items: TransactWriteItems<T>) -> Result<Self> {
        transact_write_items
            .items
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }
}

impl<T: Serialize> TransactWriteItems<T> {
    /// Execute the transaction.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_shadow.transact_write_items",
            skip_all,
            fields(items = self.items.len()),
            err
        )
    )]
    pub async fn send(
        self,
        client: &Client,
    ) -> Result<
        operation::transact_write_items::TransactWriteItemsOutput,
        error::SdkError<operation::transact_write_items::TransactWriteItemsError>,
    > {
        let transact_items: Vec<types::TransactWriteItem> =
            self.try_into().map_err(error::BuildError::other)?;
        client
            .transact_write_items()
            .set_transact_items(Some(transact_items))
            .send()
            .await
    }
}
