use crate::{
    error::{Error, Result},
    patch,
    resource::{self, bulk, record},
    shadow::{self, diff},
    store::Store,
};

use serde_json::Value;
use std::collections;

impl<S: Store> resource::Resource<'_, S> {
    /// Merge `patch` into the document `id` and return the result.
    ///
    /// Only shadow records whose key changed are written.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_shadow.update_one", skip_all, fields(resource = %self.name, id = %id), err)
    )]
    pub async fn update_one(&self, id: &str, patch: &Value) -> Result<Value> {
        self.check_patch(patch)?;
        let existing = self
            .fetch(id)
            .await?
            .ok_or_else(|| Error::ItemNotFound(format!("{}/{id}", self.name)))?;
        let prepared = self.prepare_update(0, existing, patch, &record::now())?;
        self.transact(prepared.items).await?;
        Ok(prepared.document)
    }

    /// Merge `patch` into every document of `ids`, one transaction per chunk.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_shadow.update_many",
            skip_all,
            fields(resource = %self.name, records = ids.len()),
            err
        )
    )]
    pub async fn update_many(
        &self,
        ids: &[String],
        patch: &Value,
        cancel: &bulk::CancelFlag,
    ) -> Result<bulk::BulkOutput> {
        self.check_patch(patch)?;
        let now = record::now();
        let mut existing = self.fetch_many(ids).await?;
        let mut output = bulk::BulkOutput::default();
        let mut seen = collections::HashSet::new();
        let mut prepared = Vec::with_capacity(ids.len());
        for (index, id) in ids.iter().enumerate() {
            if !seen.insert(id.as_str()) {
                let err = Error::Validation(format!("id {id:?} appears more than once"));
                output.fail(index, Some(id.clone()), &err);
                continue;
            }
            let Some(record) = existing.remove(id) else {
                let err = Error::ItemNotFound(format!("{}/{id}", self.name));
                output.fail(index, Some(id.clone()), &err);
                continue;
            };
            match self.prepare_update(index, record, patch, &now) {
                Ok(record) => prepared.push(record),
                Err(err) => output.fail(index, Some(id.clone()), &err),
            }
        }
        self.execute_bulk("updateMany", prepared, &mut output, cancel, |err| err)
            .await?;
        Ok(output)
    }

    fn check_patch(&self, patch: &Value) -> Result<()> {
        let Value::Object(fields) = patch else {
            return Err(Error::Validation(format!(
                "patch must be an object, got {patch}"
            )));
        };
        record::validate_fields(fields.keys(), self.config)
    }

    fn prepare_update(
        &self,
        index: usize,
        existing: record::StoredRecord,
        patch: &Value,
        now: &str,
    ) -> Result<bulk::Prepared> {
        let record::StoredRecord {
            id,
            document,
            shadow_keys: old_keys,
            version,
        } = existing;
        let created_at = document.get(&self.config.created_at_field).cloned();
        let Value::Object(mut document) = patch::merged(&Value::Object(document), patch) else {
            return Err(Error::Internal("merge patch produced a non-object".to_string()));
        };
        document.insert(shadow::ID_FIELD.to_string(), Value::String(id.clone()));
        if let Some(created_at) = created_at {
            document.insert(self.config.created_at_field.clone(), created_at);
        }
        document.insert(
            self.config.updated_at_field.clone(),
            Value::String(now.to_string()),
        );
        let new_keys = self.shadow_keys(&document, &id)?;
        let changes = diff::diff(&old_keys, &new_keys);
        crate::event!(
            debug,
            id = %id,
            deleted = changes.to_delete.len(),
            added = changes.to_add.len(),
            "shadow diff"
        );
        let layout = self.layout();
        let mut items = Vec::with_capacity(changes.len() + 1);
        items.push(layout.put_main(
            &id,
            &document,
            &new_keys,
            version.unwrap_or_default() + 1,
            layout.version_conditions(version),
        )?);
        items.extend(
            changes
                .to_delete
                .iter()
                .map(|key| layout.delete(key, Vec::new())),
        );
        for key in &changes.to_add {
            items.push(layout.put_shadow(&id, key, &document)?);
        }
        Ok(bulk::Prepared {
            index,
            id,
            document: Value::Object(document),
            items,
        })
    }
}
