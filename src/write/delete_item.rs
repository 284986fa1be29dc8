use crate::{common, write};

use aws_sdk_dynamodb::types;
use serde::{Serialize, ser::Error as _};
use serde_dynamo::{Error, Result};
use std::collections;

/// delete item operation
#[derive(Debug, PartialEq)]
struct DeleteItemInput {
    keys: collections::HashMap<String, types::AttributeValue>,
    write_operation: write::common::WriteInput,
}

/// Delete item operation.
///
/// ```rust
/// use aws_sdk_dynamodb::types;
/// use dynamodb_shadow::{common, write};
/// use serde_json::json;
///
/// let delete_item = write::delete_item::DeleteItem {
///     keys: common::key::Keys::new(
///         common::key::Key::new("pk", json!("tasks")),
///         common::key::Key::new("sk", json!("title#a#id#1")),
///     ),
///     write_args: write::common::WriteArgs {
///         table_name: "records".to_string(),
///         ..Default::default()
///     },
/// };
/// let delete: types::Delete = delete_item.try_into().unwrap();
/// assert_eq!(delete.table_name(), "records");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DeleteItem<T> {
    /// The primary key of the item to delete.
    pub keys: common::key::Keys<T>,
    /// Additional write operation arguments (table name, conditions).
    pub write_args: write::common::WriteArgs<T>,
}

impl<T: Serialize> TryFrom<DeleteItem<T>> for DeleteItemInput {
    type Error = Error;

    fn try_from(delete_item: DeleteItem<T>) -> Result<Self> {
        let keys = delete_item.keys.try_into()?;
        let write_operation: write::common::WriteInput = delete_item.write_args.try_into()?;
        let operation = Self {
            keys,
            write_operation,
        };
        Ok(operation)
    }
}

impl<T: Serialize> TryFrom<DeleteItem<T>> for types::Delete {
    type Error = Error;

    fn try_from(delete_item: DeleteItem<T>) -> Result<Self> {
        let delete_item: DeleteItemInput = delete_item.try_into()?;
        let builder = Self::builder().set_key(Some(delete_item.keys));
        crate::apply_write_operation!(builder, delete_item.write_operation)
            .build()
            .map_err(Error::custom)
    }
}
