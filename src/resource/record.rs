//! Layout of main and shadow records, and the document checks applied on write.

use crate::{
    common,
    config::{self, Config},
    error::{Error, Result},
    read,
    shadow::{self, codec},
    store::Item,
    write,
};

use chrono::{Duration, Utc};
use serde_json::{Map, Value};
use std::collections;
use uuid::Uuid;

/// Shadow keys currently derived from the document.
pub const SHADOW_KEYS_FIELD: &str = "__shadowKeys";

/// Optimistic concurrency version of the main record.
pub const VERSION_FIELD: &str = "__version";

/// Expiry of the record, in epoch seconds.
pub const EXPIRES_AT_FIELD: &str = "__expiresAt";

/// A fresh time-ordered id.
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Id given by a caller: a non-empty string without the separator, or a number.
pub fn parse_id(value: &Value) -> Result<String> {
    let id = match value {
        Value::String(id) => id.clone(),
        Value::Number(number) => number.to_string(),
        _ => return Err(Error::Validation(format!("id must be a string, got {value}"))),
    };
    if id.is_empty() || id.contains(shadow::SEPARATOR) {
        return Err(Error::Validation(format!(
            "id must be non-empty and must not contain {:?}, got {id:?}",
            shadow::SEPARATOR
        )));
    }
    Ok(id)
}

/// Ids of a list, in order.
pub fn parse_ids(values: &[Value]) -> Result<Vec<String>> {
    values.iter().map(parse_id).collect()
}

/// Reject field names that collide with the table keys or internal bookkeeping.
pub fn validate_fields<'a>(
    fields: impl IntoIterator<Item = &'a String>,
    config: &Config,
) -> Result<()> {
    for field in fields {
        if field == &config.partition_key_name || field == &config.sort_key_name {
            return Err(Error::Validation(format!(
                "field {field:?} is reserved for the table key"
            )));
        }
        if field.starts_with(config::INTERNAL_PREFIX) {
            return Err(Error::Validation(format!(
                "field {field:?} uses the reserved prefix {:?}",
                config::INTERNAL_PREFIX
            )));
        }
    }
    Ok(())
}

/// Current time as stamped on documents.
pub fn now() -> String {
    codec::format_datetime(&Utc::now())
}

/// Expiry `retention_days` after `created_at`, in epoch seconds.
pub fn expires_at(created_at: Option<&Value>, retention_days: Option<u32>) -> Result<Option<i64>> {
    let Some(retention_days) = retention_days else {
        return Ok(None);
    };
    let created_at = created_at
        .and_then(codec::parse_datetime)
        .unwrap_or_else(Utc::now);
    created_at
        .checked_add_signed(Duration::days(i64::from(retention_days)))
        .map(|expires_at| Some(expires_at.timestamp()))
        .ok_or_else(|| {
            Error::Config(format!(
                "retention of {retention_days} days is past the supported date range"
            ))
        })
}

/// A main record as read back from the table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StoredRecord {
    /// Document id.
    pub id: String,
    /// Document without key attributes and internal fields.
    pub document: Map<String, Value>,
    /// Shadow keys the record says it owns.
    pub shadow_keys: collections::BTreeSet<String>,
    /// Optimistic concurrency version, absent on records written elsewhere.
    pub version: Option<u64>,
}

impl StoredRecord {
    /// Split a stored main item into document and bookkeeping.
    pub fn from_item(mut item: Item, config: &Config) -> Result<Self> {
        let sort_key = item.remove(&config.sort_key_name);
        item.remove(&config.partition_key_name);
        let shadow_keys = match item.remove(SHADOW_KEYS_FIELD) {
            Some(Value::Array(keys)) => keys
                .into_iter()
                .filter_map(|key| match key {
                    Value::String(key) => Some(key),
                    _ => None,
                })
                .collect(),
            _ => collections::BTreeSet::new(),
        };
        let version = item.remove(VERSION_FIELD).and_then(|version| version.as_u64());
        item.retain(|field, _| !field.starts_with(config::INTERNAL_PREFIX));
        let id = sort_key
            .as_ref()
            .and_then(Value::as_str)
            .and_then(shadow::key::main_key_id)
            .or_else(|| item.get(shadow::ID_FIELD).and_then(Value::as_str))
            .map(str::to_string)
            .ok_or_else(|| Error::Internal("main record without an id".to_string()))?;
        Ok(Self {
            id,
            document: item,
            shadow_keys,
            version,
        })
    }
}

/// Builds the store requests of one resource partition.
#[derive(Clone, Copy, Debug)]
pub struct Layout<'a> {
    config: &'a Config,
    partition: &'a str,
}

impl<'a> Layout<'a> {
    /// Layout of the partition `partition`.
    pub fn new(config: &'a Config, partition: &'a str) -> Self {
        Self { config, partition }
    }

    /// Key of the item at `sort_key`.
    pub fn keys(&self, sort_key: &str) -> common::key::Keys<Value> {
        common::key::Keys::new(
            common::key::Key::new(
                &self.config.partition_key_name,
                Value::String(self.partition.to_string()),
            ),
            common::key::Key::new(
                &self.config.sort_key_name,
                Value::String(sort_key.to_string()),
            ),
        )
    }

    /// Key of the main record of `id`.
    pub fn main_keys(&self, id: &str) -> common::key::Keys<Value> {
        self.keys(&shadow::key::main_key(id))
    }

    fn single_read_args(&self) -> read::common::SingleReadArgs {
        read::common::SingleReadArgs {
            consistent_read: Some(true),
            table_name: self.config.table_name.clone(),
        }
    }

    /// Strongly consistent read of the main record of `id`.
    pub fn get_main(&self, id: &str) -> read::get_item::GetItem<Value> {
        read::get_item::GetItem {
            keys: self.main_keys(id),
            single_read_args: self.single_read_args(),
        }
    }

    /// Strongly consistent read of the main records of `ids`.
    pub fn batch_get_main(&self, ids: &[String]) -> read::batch_get_item::BatchGetItem<Value> {
        read::batch_get_item::BatchGetItem {
            keys: ids.iter().map(|id| self.main_keys(id)).collect(),
            single_read_args: self.single_read_args(),
        }
    }

    /// One page of the partition, restricted by `sort_key_condition`.
    pub fn query(
        &self,
        sort_key_condition: common::condition::Condition<Value>,
        forward: bool,
        limit: usize,
        exclusive_start_sort_key: Option<&str>,
    ) -> read::query::Query<Value> {
        let exclusive_start_key = exclusive_start_sort_key.map(|sort_key| {
            collections::HashMap::from([
                (
                    self.config.partition_key_name.clone(),
                    Value::String(self.partition.to_string()),
                ),
                (
                    self.config.sort_key_name.clone(),
                    Value::String(sort_key.to_string()),
                ),
            ])
        });
        read::query::Query {
            multiple_read_args: read::common::MultipleReadArgs {
                consistent_read: Some(true),
                exclusive_start_key,
                limit: Some(i32::try_from(limit).unwrap_or(i32::MAX)),
                table_name: self.config.table_name.clone(),
            },
            partition_key: common::key::Key::new(
                &self.config.partition_key_name,
                Value::String(self.partition.to_string()),
            ),
            scan_index_forward: Some(forward),
            sort_key_condition: Some(common::condition::KeyCondition::new(
                &self.config.sort_key_name,
                sort_key_condition,
            )),
        }
    }

    fn write_args(
        &self,
        conditions: Vec<common::condition::KeyCondition<Value>>,
    ) -> write::common::WriteArgs<Value> {
        write::common::WriteArgs {
            conditions,
            table_name: self.config.table_name.clone(),
            ..Default::default()
        }
    }

    /// The main record must not exist yet.
    pub fn insert_conditions(&self) -> Vec<common::condition::KeyCondition<Value>> {
        vec![common::condition::KeyCondition::new(
            &self.config.sort_key_name,
            common::condition::Condition::Null,
        )]
    }

    /// The main record must still be at `version`.
    pub fn version_conditions(
        &self,
        version: Option<u64>,
    ) -> Vec<common::condition::KeyCondition<Value>> {
        match version {
            Some(version) => vec![common::condition::KeyCondition::new(
                VERSION_FIELD,
                common::condition::Condition::Equals(Value::from(version)),
            )],
            None => vec![
                common::condition::KeyCondition::new(
                    &self.config.sort_key_name,
                    common::condition::Condition::NotNull,
                ),
                common::condition::KeyCondition::new(
                    VERSION_FIELD,
                    common::condition::Condition::Null,
                ),
            ],
        }
    }

    /// Put of the main record of `document`.
    pub fn put_main(
        &self,
        id: &str,
        document: &Map<String, Value>,
        shadow_keys: &collections::BTreeSet<String>,
        version: u64,
        conditions: Vec<common::condition::KeyCondition<Value>>,
    ) -> Result<write::transact_write_items::TransactWriteItem<Value>> {
        let mut item = self.main_keys(id).to_item();
        item.extend(document.iter().map(|(field, value)| (field.clone(), value.clone())));
        item.insert(
            SHADOW_KEYS_FIELD.to_string(),
            Value::Array(shadow_keys.iter().cloned().map(Value::String).collect()),
        );
        item.insert(VERSION_FIELD.to_string(), Value::from(version));
        if let Some(expires_at) = self.expires_at(document)? {
            item.insert(EXPIRES_AT_FIELD.to_string(), Value::from(expires_at));
        }
        Ok(write::transact_write_items::TransactWriteItem::Put(write::put_item::PutItem {
            item: Value::Object(item),
            write_args: self.write_args(conditions),
        }))
    }

    /// Put of the shadow record at `sort_key`, expiring with `document`.
    pub fn put_shadow(
        &self,
        id: &str,
        sort_key: &str,
        document: &Map<String, Value>,
    ) -> Result<write::transact_write_items::TransactWriteItem<Value>> {
        let mut item = self.keys(sort_key).to_item();
        item.insert(shadow::ID_FIELD.to_string(), Value::String(id.to_string()));
        if let Some(expires_at) = self.expires_at(document)? {
            item.insert(EXPIRES_AT_FIELD.to_string(), Value::from(expires_at));
        }
        Ok(write::transact_write_items::TransactWriteItem::Put(write::put_item::PutItem {
            item: Value::Object(item),
            write_args: self.write_args(Vec::new()),
        }))
    }

    /// Delete of the item at `sort_key`.
    pub fn delete(
        &self,
        sort_key: &str,
        conditions: Vec<common::condition::KeyCondition<Value>>,
    ) -> write::transact_write_items::TransactWriteItem<Value> {
        write::transact_write_items::TransactWriteItem::Delete(write::delete_item::DeleteItem {
            keys: self.keys(sort_key),
            write_args: self.write_args(conditions),
        })
    }

    fn expires_at(&self, document: &Map<String, Value>) -> Result<Option<i64>> {
        let retention_days = self
            .config
            .resources
            .get(self.partition)
            .and_then(|resource| resource.retention_days);
        expires_at(document.get(&self.config.created_at_field), retention_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceConfig;

    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case::string(json!("abc"), "abc")]
    #[case::uuid(json!("01890a5d-ac96-774b-bcce-b302099a8057"), "01890a5d-ac96-774b-bcce-b302099a8057")]
    #[case::number(json!(42), "42")]
    fn test_parse_id(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(parse_id(&value).unwrap(), expected);
    }

    #[rstest]
    #[case::empty(json!(""))]
    #[case::separator(json!("a#b"))]
    #[case::null(json!(null))]
    #[case::object(json!({"id": "a"}))]
    fn test_parse_id_invalid(#[case] value: Value) {
        let err = parse_id(&value).unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{err:?}");
    }

    #[test]
    fn test_new_id_is_time_ordered() {
        let first = new_id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = new_id();
        assert!(first < second);
        assert!(parse_id(&Value::String(first)).is_ok());
    }

    #[rstest]
    #[case::plain(&["title", "done"], true)]
    #[case::partition_key(&["title", "pk"], false)]
    #[case::sort_key(&["sk"], false)]
    #[case::internal(&["__shadowKeys"], false)]
    #[case::single_underscore(&["_private"], true)]
    fn test_validate_fields(#[case] fields: &[&str], #[case] valid: bool) {
        let fields: Vec<String> = fields.iter().map(|field| field.to_string()).collect();
        assert_eq!(validate_fields(&fields, &Config::new("t")).is_ok(), valid);
    }

    #[test]
    fn test_expires_at() {
        let created_at = json!("2024-01-01T00:00:00.000Z");
        assert_eq!(expires_at(Some(&created_at), None).unwrap(), None);
        assert_eq!(
            expires_at(Some(&created_at), Some(1)).unwrap(),
            Some(1_704_153_600)
        );
        let err = expires_at(Some(&created_at), Some(u32::MAX)).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{err:?}");
    }

    #[test]
    fn test_stored_record_from_item() {
        let item = json!({
            "pk": "tasks",
            "sk": "id#1",
            "id": "1",
            "title": "a",
            "__shadowKeys": ["title#a#id#1"],
            "__version": 3,
            "__expiresAt": 1,
            "__other": true,
        });
        let record =
            StoredRecord::from_item(item.as_object().unwrap().clone(), &Config::new("t")).unwrap();
        assert_eq!(record.id, "1");
        assert_eq!(record.version, Some(3));
        assert_eq!(
            record.shadow_keys,
            collections::BTreeSet::from(["title#a#id#1".to_string()])
        );
        assert_eq!(
            Value::Object(record.document),
            json!({"id": "1", "title": "a"})
        );
    }

    #[test]
    fn test_stored_record_id_from_sort_key() {
        let item = json!({"pk": "tasks", "sk": "id#7", "title": "a"});
        let record =
            StoredRecord::from_item(item.as_object().unwrap().clone(), &Config::new("t")).unwrap();
        assert_eq!(record.id, "7");
        assert_eq!(record.version, None);
        assert!(record.shadow_keys.is_empty());
    }

    #[test]
    fn test_put_main_with_retention() {
        let mut config = Config::new("t");
        config.resources.insert(
            "tasks".to_string(),
            ResourceConfig {
                retention_days: Some(1),
                ..Default::default()
            },
        );
        let layout = Layout::new(&config, "tasks");
        let document = json!({"id": "1", "createdAt": "2024-01-01T00:00:00.000Z"});
        let keys = collections::BTreeSet::from(["createdAt#2024-01-01T00:00:00.000Z#id#1".to_string()]);
        let write::transact_write_items::TransactWriteItem::Put(put) = layout.put_main(
            "1",
            document.as_object().unwrap(),
            &keys,
            1,
            layout.insert_conditions(),
        )
        .unwrap() else {
            panic!("expected a put");
        };
        assert_eq!(
            put.item,
            json!({
                "pk": "tasks",
                "sk": "id#1",
                "id": "1",
                "createdAt": "2024-01-01T00:00:00.000Z",
                "__shadowKeys": ["createdAt#2024-01-01T00:00:00.000Z#id#1"],
                "__version": 1,
                "__expiresAt": 1_704_153_600,
            })
        );
        assert_eq!(put.write_args.conditions, layout.insert_conditions());
        let write::transact_write_items::TransactWriteItem::Put(shadow) =
            layout.put_shadow("1", "title#a#id#1", document.as_object().unwrap()).unwrap()
        else {
            panic!("expected a put");
        };
        assert_eq!(
            shadow.item,
            json!({"pk": "tasks", "sk": "title#a#id#1", "id": "1", "__expiresAt": 1_704_153_600})
        );
    }

    #[test]
    fn test_version_conditions() {
        let config = Config::new("t");
        let layout = Layout::new(&config, "tasks");
        assert_eq!(
            layout.version_conditions(Some(2)),
            vec![common::condition::KeyCondition::new(
                VERSION_FIELD,
                common::condition::Condition::Equals(json!(2)),
            )]
        );
        assert_eq!(layout.version_conditions(None).len(), 2);
    }
}
