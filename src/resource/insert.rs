use crate::{
    error::{Error, Result},
    resource::{self, bulk, record},
    shadow,
    store::Store,
};

use serde_json::{Map, Value};
use std::collections;

/// A failed insert condition means the id is taken.
fn already_exists(err: Error, id: Option<&str>) -> Error {
    match err {
        Error::Conflict(_) => Error::Validation(match id {
            Some(id) => format!("a record with id {id:?} already exists"),
            None => "a record with one of the ids already exists".to_string(),
        }),
        err => err,
    }
}

impl<S: Store> resource::Resource<'_, S> {
    /// Insert `data`, assigning an id when it has none, and return the stored document.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_shadow.insert_one", skip_all, fields(resource = %self.name), err)
    )]
    pub async fn insert_one(&self, data: Value) -> Result<Value> {
        let prepared = self.prepare_insert(0, data, &record::now())?;
        self.transact(prepared.items)
            .await
            .map_err(|err| already_exists(err, Some(&prepared.id)))?;
        Ok(prepared.document)
    }

    /// Insert every document of `data`, one transaction per chunk.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_shadow.insert_many",
            skip_all,
            fields(resource = %self.name, records = data.len()),
            err
        )
    )]
    pub async fn insert_many(
        &self,
        data: Vec<Value>,
        cancel: &bulk::CancelFlag,
    ) -> Result<bulk::BulkOutput> {
        let now = record::now();
        let mut output = bulk::BulkOutput::default();
        let mut ids = collections::HashSet::new();
        let mut prepared = Vec::with_capacity(data.len());
        for (index, data) in data.into_iter().enumerate() {
            let id = resource::id_hint(&data);
            match self.prepare_insert(index, data, &now) {
                Ok(record) if !ids.insert(record.id.clone()) => {
                    let err = Error::Validation(format!(
                        "id {:?} appears more than once",
                        record.id
                    ));
                    output.fail(index, Some(record.id), &err);
                }
                Ok(record) => prepared.push(record),
                Err(err) => output.fail(index, id, &err),
            }
        }
        self.execute_bulk("insertMany", prepared, &mut output, cancel, |err| {
            already_exists(err, None)
        })
        .await?;
        Ok(output)
    }

    fn prepare_insert(&self, index: usize, data: Value, now: &str) -> Result<bulk::Prepared> {
        let data = resource::document_object(data, self.config)?;
        let id = match data.get(shadow::ID_FIELD) {
            Some(id) if !id.is_null() => record::parse_id(id)?,
            _ => record::new_id(),
        };
        let mut document = Map::with_capacity(data.len() + 3);
        document.insert(shadow::ID_FIELD.to_string(), Value::String(id.clone()));
        for (field, value) in data {
            if field != shadow::ID_FIELD
                && field != self.config.created_at_field
                && field != self.config.updated_at_field
            {
                document.insert(field, value);
            }
        }
        document.insert(
            self.config.created_at_field.clone(),
            Value::String(now.to_string()),
        );
        document.insert(
            self.config.updated_at_field.clone(),
            Value::String(now.to_string()),
        );
        let shadow_keys = self.shadow_keys(&document, &id)?;
        let layout = self.layout();
        let mut items = Vec::with_capacity(shadow_keys.len() + 1);
        items.push(layout.put_main(
            &id,
            &document,
            &shadow_keys,
            1,
            layout.insert_conditions(),
        )?);
        for key in &shadow_keys {
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
