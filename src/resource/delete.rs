use crate::{
    error::{Error, Result},
    resource::{self, bulk, record},
    shadow,
    store::Store,
};

use serde_json::Value;
use std::collections;

impl<S: Store> resource::Resource<'_, S> {
    /// Delete the document `id` with its shadow records and return it.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_shadow.delete_one", skip_all, fields(resource = %self.name, id = %id), err)
    )]
    pub async fn delete_one(&self, id: &str) -> Result<Value> {
        let existing = self
            .fetch(id)
            .await?
            .ok_or_else(|| Error::ItemNotFound(format!("{}/{id}", self.name)))?;
        let prepared = self.prepare_delete(0, existing);
        self.transact(prepared.items).await?;
        Ok(prepared.document)
    }

    /// Delete every document of `ids`, one transaction per chunk.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_shadow.delete_many",
            skip_all,
            fields(resource = %self.name, records = ids.len()),
            err
        )
    )]
    pub async fn delete_many(
        &self,
        ids: &[String],
        cancel: &bulk::CancelFlag,
    ) -> Result<bulk::BulkOutput> {
        let mut existing = self.fetch_many(ids).await?;
        let mut output = bulk::BulkOutput::default();
        let mut seen = collections::HashSet::new();
        let mut prepared = Vec::with_capacity(ids.len());
        for (index, id) in ids.iter().enumerate() {
            if !seen.insert(id.as_str()) {
                let err = Error::Validation(format!("id {id:?} appears more than once"));
                output.fail(index, Some(id.clone()), &err);
            } else if let Some(record) = existing.remove(id) {
                prepared.push(self.prepare_delete(index, record));
            } else {
                let err = Error::ItemNotFound(format!("{}/{id}", self.name));
                output.fail(index, Some(id.clone()), &err);
            }
        }
        self.execute_bulk("deleteMany", prepared, &mut output, cancel, |err| err)
            .await?;
        Ok(output)
    }

    fn prepare_delete(&self, index: usize, existing: record::StoredRecord) -> bulk::Prepared {
        let layout = self.layout();
        let mut items = Vec::with_capacity(existing.shadow_keys.len() + 1);
        items.push(layout.delete(
            &shadow::key::main_key(&existing.id),
            layout.version_conditions(existing.version),
        ));
        items.extend(
            existing
                .shadow_keys
                .iter()
                .map(|key| layout.delete(key, Vec::new())),
        );
        bulk::Prepared {
            index,
            id: existing.id,
            document: Value::Object(existing.document),
            items,
        }
    }
}
