#![doc(
    html_logo_url = "https://raw.githubusercontent.com/dariocurr/dynamodb-shadow/main/assets/logo.png",
    html_favicon_url = "https://raw.githubusercontent.com/dariocurr/dynamodb-shadow/main/assets/logo.png"
)]
#![deny(missing_docs)]
#![deny(warnings)]

//! # DynamoDB Shadow
//!
//! Sortable secondary indexes, filtered pagination and chunked transactional
//! writes for documents stored in a single DynamoDB table.
//!
//! ## Overview
//!
//! Every document lives in the partition of its resource under the sort key
//! `id#<id>`. Each of its scalar fields additionally owns a *shadow record* whose
//! sort key is `<field>#<encoded-value>#id#<id>`, encoded so that byte order
//! matches value order. A query over `<field>#` is therefore an index scan on
//! `<field>`, without any global secondary index.
//!
//! - Writes keep main and shadow records in step inside one transaction per
//!   document, or per chunk of documents for bulk calls.
//! - Reads plan a key range from the sort field and the filters, resolve the
//!   shadow rows back to documents and filter them in memory.
//! - Pages are continued with opaque tokens.
//!
//! ## Quick Example
//!
//! ```no_run
//! use aws_sdk_dynamodb::Client;
//! use dynamodb_shadow::{config, dispatch};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let client = Client::from_conf(aws_sdk_dynamodb::config::Config::builder().build());
//! let engine = dispatch::Engine::new(client, config::Config::new("records"))?;
//! engine
//!     .handle("insertOne", "tasks", json!({"data": {"title": "Fix the build", "priority": 7}}))
//!     .await?;
//! // Scans `priority#1000000000000005#id#` up to the end of the `priority` range
//! let page = engine
//!     .handle(
//!         "find",
//!         "tasks",
//!         json!({
//!             "sort": {"field": "priority", "order": "desc"},
//!             "filter": {"priority:gte:number": 5},
//!             "limit": 10,
//!         }),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`mod@dispatch`] - Operation routing and request parameters
//! - [`mod@resource`] - Reads, writes and the query planner of one resource
//! - [`mod@shadow`] - Shadow key encoding, inference and diffing
//! - [`mod@filter`] - Filter syntax and in-memory matching
//! - [`mod@store`] - The table seam and its DynamoDB implementation
//! - [`mod@read`] / [`mod@write`] - Structured DynamoDB requests

#[cfg(feature = "tracing")]
macro_rules! event {
    ($level:ident, $($arg:tt)+) => {
        ::tracing::$level!($($arg)+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! event {
    ($level:ident, $($arg:tt)+) => {
        ()
    };
}

pub(crate) use event;

/// Common utilities for keys and conditions.
pub mod common;

/// Engine configuration and per-resource settings.
pub mod config;

/// Routing of `(operation, resource, params)` requests.
pub mod dispatch;

/// Crate error, caller-facing codes and per-record bulk errors.
pub mod error;

/// Filter parsing and matching.
pub mod filter;

/// Continuation tokens.
pub mod pagination;

/// JSON Merge Patch (RFC 7396).
pub mod patch;

/// Read operations for retrieving data from DynamoDB tables.
///
/// This module provides operations for:
/// - Getting individual items by key
/// - Querying one page of a partition
/// - Batch retrieving multiple items
pub mod read;

/// Documents of one resource and their shadow records.
pub mod resource;

/// Shadow keys.
pub mod shadow;

/// The table seam.
pub mod store;

/// Write operations for modifying data in DynamoDB tables.
///
/// This module provides operations for:
/// - Putting new items or replacing existing ones
/// - Deleting items by key
/// - Applying puts and deletes as one transaction
pub mod write;
