//! `(operation, resource, params)` requests routed onto resources.
//!
//! ```rust,no_run
//! use aws_sdk_dynamodb::Client;
//! use dynamodb_shadow::{config, dispatch};
//! use serde_json::json;
//!
//! # async fn example(client: Client) -> Result<(), Box<dyn std::error::Error>> {
//! let engine = dispatch::Engine::new(client, config::Config::from_env()?)?;
//! let response = match engine
//!     .handle("findOne", "tasks", json!({"id": "01890a5d-ac96-774b-bcce-b302099a8057"}))
//!     .await
//! {
//!     Ok(payload) => payload,
//!     Err(err) => err.to_response(),
//! };
//! # Ok(())
//! # }
//! ```

use crate::{
    config::Config,
    error::{Error, Result},
    resource::{self, bulk, find, record},
    store::Store,
};

use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use std::str;

/// Operations a request may name.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operation {
    /// Paged, sorted and filtered read.
    Find,
    /// Read of one document.
    FindOne,
    /// Read of several documents.
    FindMany,
    /// Find restricted to documents referencing another one.
    FindManyReference,
    /// Insert of one document.
    InsertOne,
    /// Insert of several documents.
    InsertMany,
    /// Merge-patch of one document.
    UpdateOne,
    /// Merge-patch of several documents.
    UpdateMany,
    /// Delete of one document.
    DeleteOne,
    /// Delete of several documents.
    DeleteMany,
}

impl str::FromStr for Operation {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "find" => Ok(Self::Find),
            "findOne" => Ok(Self::FindOne),
            "findMany" => Ok(Self::FindMany),
            "findManyReference" => Ok(Self::FindManyReference),
            "insertOne" => Ok(Self::InsertOne),
            "insertMany" => Ok(Self::InsertMany),
            "updateOne" => Ok(Self::UpdateOne),
            "updateMany" => Ok(Self::UpdateMany),
            "deleteOne" => Ok(Self::DeleteOne),
            "deleteMany" => Ok(Self::DeleteMany),
            _ => Err(Error::Validation(format!("unknown operation {value:?}"))),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct IdParams {
    id: Value,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct IdsParams {
    ids: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DataParams<T> {
    data: T,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateOneParams {
    id: Value,
    data: Value,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateManyParams {
    ids: Vec<Value>,
    data: Value,
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T> {
    serde_json::from_value(params).map_err(|err| Error::Validation(format!("invalid params: {err}")))
}

/// Entry point of transports: owns the store and the configuration.
#[derive(Debug)]
pub struct Engine<S> {
    store: S,
    config: Config,
}

impl<S: Store> Engine<S> {
    /// Engine over `store`, once `config` validates.
    pub fn new(store: S, config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// The engine configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle on `name`.
    pub fn resource(&self, name: &str) -> Result<resource::Resource<'_, S>> {
        resource::Resource::new(&self.store, &self.config, name)
    }

    /// Run `operation` on `resource`.
    ///
    /// Bulk calls where some records failed return [`Error::PartialFailure`]
    /// carrying the per-record outcome.
    pub async fn handle(&self, operation: &str, resource: &str, params: Value) -> Result<Value> {
        self.handle_with_cancel(operation, resource, params, &bulk::CancelFlag::new())
            .await
    }

    /// [`handle`](Self::handle), stopping bulk calls between chunks once `cancel` is raised.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_shadow.handle", skip(self, params, cancel), err)
    )]
    pub async fn handle_with_cancel(
        &self,
        operation: &str,
        resource: &str,
        params: Value,
        cancel: &bulk::CancelFlag,
    ) -> Result<Value> {
        let operation: Operation = operation.parse()?;
        let resource = self.resource(resource)?;
        crate::event!(debug, ?operation, resource = resource.name(), "handling request");
        let params = match params {
            Value::Null => Value::Object(Default::default()),
            params => params,
        };
        match operation {
            Operation::Find => {
                let output = resource.find(parse_params(params)?).await?;
                Ok(serde_json::to_value(output)?)
            }
            Operation::FindOne => {
                let IdParams { id } = parse_params(params)?;
                let document = resource.find_one(&record::parse_id(&id)?).await?;
                Ok(document.unwrap_or(Value::Null))
            }
            Operation::FindMany => {
                let IdsParams { ids } = parse_params(params)?;
                let documents = resource.find_many(&record::parse_ids(&ids)?).await?;
                Ok(Value::Array(documents))
            }
            Operation::FindManyReference => {
                let Value::Object(mut fields) = params else {
                    return Err(Error::Validation("params must be an object".to_string()));
                };
                let target = match fields.remove("target") {
                    Some(Value::String(target)) => target,
                    _ => return Err(Error::Validation("target must be a string".to_string())),
                };
                let id = fields
                    .remove("id")
                    .filter(|id| !id.is_null())
                    .ok_or_else(|| Error::Validation("id is required".to_string()))?;
                let find = parse_params::<find::FindParams>(Value::Object(fields))?;
                let output = resource.find_many_reference(&target, id, find).await?;
                Ok(serde_json::to_value(output)?)
            }
            Operation::InsertOne => {
                let DataParams { data } = parse_params::<DataParams<Value>>(params)?;
                resource.insert_one(data).await
            }
            Operation::InsertMany => {
                let DataParams { data } = parse_params::<DataParams<Vec<Value>>>(params)?;
                let total = data.len();
                let output = resource.insert_many(data, cancel).await?;
                Ok(serde_json::to_value(output.into_result(total)?)?)
            }
            Operation::UpdateOne => {
                let UpdateOneParams { id, data } = parse_params(params)?;
                resource.update_one(&record::parse_id(&id)?, &data).await
            }
            Operation::UpdateMany => {
                let UpdateManyParams { ids, data } = parse_params(params)?;
                let output = resource
                    .update_many(&record::parse_ids(&ids)?, &data, cancel)
                    .await?;
                Ok(serde_json::to_value(output.into_result(ids.len())?)?)
            }
            Operation::DeleteOne => {
                let IdParams { id } = parse_params(params)?;
                resource.delete_one(&record::parse_id(&id)?).await
            }
            Operation::DeleteMany => {
                let IdsParams { ids } = parse_params(params)?;
                let output = resource
                    .delete_many(&record::parse_ids(&ids)?, cancel)
                    .await?;
                Ok(serde_json::to_value(output.into_result(ids.len())?)?)
            }
        }
    }
}
