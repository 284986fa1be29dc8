//! Read requests against the table: single items by key, pages of a
//! partition, and batches of keys.

/// Batch get item operation for retrieving multiple items by key.
pub mod batch_get_item;

/// Common arguments of read operations.
pub mod common;

/// Get item operation for retrieving a single item by primary key.
pub mod get_item;

/// Query operation for reading one page of a partition.
pub mod query;
