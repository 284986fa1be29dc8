//! Write requests: puts and deletes grouped into all-or-nothing transactions.

/// Common arguments of write operations.
pub mod common;

/// Delete item operation for removing an item inside a transaction.
pub mod delete_item;

/// Put item operation for creating or replacing an item inside a transaction.
pub mod put_item;

/// Transactions of puts and deletes that succeed or fail together.
pub mod transact_write_items;
