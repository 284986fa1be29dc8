//! The seam between the engine and the table.
//!
//! [`Store`] is implemented for [`aws_sdk_dynamodb::Client`]; items cross the
//! seam as JSON maps so the engine never handles attribute values.

/// [`Store`] over the DynamoDB client.
pub mod client;

#[cfg(test)]
pub(crate) mod memory;

use crate::{
    error::{Error, Result},
    read, write,
};

use serde_json::{Map, Value};
use std::{future::Future, time};

/// A stored item.
pub type Item = Map<String, Value>;

/// One page of a query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// Items in sort key order.
    pub items: Vec<Item>,
    /// Key of the last evaluated item, when the store may hold more rows.
    pub last_evaluated_key: Option<Item>,
}

/// Primary-key-only table with atomic multi-item transactions.
pub trait Store: Send + Sync {
    /// The item at the given key, if any.
    fn get_item(
        &self,
        get_item: read::get_item::GetItem<Value>,
    ) -> impl Future<Output = Result<Option<Item>>> + Send;

    /// One page of a partition.
    fn query(&self, query: read::query::Query<Value>) -> impl Future<Output = Result<Page>> + Send;

    /// The items found at the given keys, in no particular order.
    ///
    /// Any number of distinct keys may be passed.
    fn batch_get_item(
        &self,
        batch_get_item: read::batch_get_item::BatchGetItem<Value>,
    ) -> impl Future<Output = Result<Vec<Item>>> + Send;

    /// Apply every write or none.
    ///
    /// A failed write condition surfaces as [`Error::Conflict`].
    fn transact_write_items(
        &self,
        transact_write_items: write::transact_write_items::TransactWriteItems<Value>,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Await `future`, failing with [`Error::Timeout`] after `duration`.
pub(crate) async fn with_timeout<T>(
    duration: time::Duration,
    operation: &str,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| Error::Timeout(format!("{operation} exceeded {}ms", duration.as_millis())))?
}
