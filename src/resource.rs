//! Reads and writes of one resource, keeping its shadow records in step.
//!
//! ```rust,no_run
//! use aws_sdk_dynamodb::Client;
//! use dynamodb_shadow::{config, resource};
//! use serde_json::json;
//!
//! # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
//! let config = config::Config::new("records");
//! let tasks = resource::Resource::new(client, &config, "tasks")?;
//! let task = tasks.insert_one(json!({"title": "Fix the build", "priority": 7})).await?;
//! let page = tasks
//!     .find(serde_json::from_value(json!({
//!         "sort": {"field": "priority", "order": "desc"},
//!         "filter": {"priority:gte:number": 5},
//!     }))?)
//!     .await?;
//! # Ok(())
//! # }
//! ```

/// Chunked execution of bulk writes.
pub mod bulk;

/// Greedy packing of records under the transaction ceiling.
pub mod chunk;

/// Deletes.
pub mod delete;

/// Reads and the query planner.
pub mod find;

/// Inserts.
pub mod insert;

/// Layout of main and shadow records.
pub mod record;

/// Merge-patch updates.
pub mod update;

use crate::{
    config::{Config, ResourceConfig},
    error::{Error, Result},
    shadow::{self, codec},
    store::{self, Store},
    write,
};

use serde_json::{Map, Value};
use std::{collections, future::Future};

/// Handle on the records of one resource.
#[derive(Debug)]
pub struct Resource<'a, S> {
    store: &'a S,
    config: &'a Config,
    name: String,
    settings: ResourceConfig,
}

impl<'a, S: Store> Resource<'a, S> {
    /// Handle on `name`, which must be a configured resource when any are configured.
    pub fn new(store: &'a S, config: &'a Config, name: &str) -> Result<Self> {
        config.validate()?;
        let settings = config.resource(name)?;
        Ok(Self {
            store,
            config,
            name: name.to_string(),
            settings,
        })
    }

    /// Resource name, which is also its partition key.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn layout(&self) -> record::Layout<'_> {
        record::Layout::new(self.config, &self.name)
    }

    fn codec(&self) -> codec::Codec<'_> {
        codec::Codec::new(
            &self.config.codec,
            &self.config.created_at_field,
            &self.config.updated_at_field,
        )
    }

    fn shadow_keys(
        &self,
        document: &Map<String, Value>,
        id: &str,
    ) -> Result<collections::BTreeSet<String>> {
        shadow::document_keys(document, id, &self.settings, &self.codec())
    }

    async fn call<T>(
        &self,
        operation: &str,
        future: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        store::with_timeout(self.config.store_timeout, operation, future).await
    }

    /// Main record of `id`.
    async fn fetch(&self, id: &str) -> Result<Option<record::StoredRecord>> {
        let item = self
            .call("getItem", self.store.get_item(self.layout().get_main(id)))
            .await?;
        item.map(|item| record::StoredRecord::from_item(item, self.config))
            .transpose()
    }

    /// Main records of `ids` keyed by id; absent ids are left out.
    async fn fetch_many(
        &self,
        ids: &[String],
    ) -> Result<collections::HashMap<String, record::StoredRecord>> {
        let mut seen = collections::HashSet::new();
        let unique: Vec<String> = ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();
        if unique.is_empty() {
            return Ok(collections::HashMap::new());
        }
        let items = self
            .call(
                "batchGetItem",
                self.store.batch_get_item(self.layout().batch_get_main(&unique)),
            )
            .await?;
        items
            .into_iter()
            .map(|item| {
                record::StoredRecord::from_item(item, self.config)
                    .map(|record| (record.id.clone(), record))
            })
            .collect()
    }

    /// Apply `items` as one transaction.
    async fn transact(
        &self,
        items: Vec<write::transact_write_items::TransactWriteItem<Value>>,
    ) -> Result<()> {
        if items.len() > self.config.max_transaction_items {
            return Err(Error::Config(format!(
                "one record needs {} transaction items, the ceiling is {}",
                items.len(),
                self.config.max_transaction_items
            )));
        }
        if items.is_empty() {
            return Ok(());
        }
        self.call(
            "transactWriteItems",
            self.store
                .transact_write_items(write::transact_write_items::TransactWriteItems { items }),
        )
        .await
    }
}

/// Reject documents that are not objects or that use reserved field names.
fn document_object(value: Value, config: &Config) -> Result<Map<String, Value>> {
    let Value::Object(document) = value else {
        return Err(Error::Validation(format!(
            "document must be an object, got {value}"
        )));
    };
    record::validate_fields(document.keys(), config)?;
    Ok(document)
}

/// Id a caller attached to a raw document, for error reports.
fn id_hint(value: &Value) -> Option<String> {
    value
        .get(shadow::ID_FIELD)
        .and_then(|id| record::parse_id(id).ok())
}
