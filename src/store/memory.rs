//! In-memory [`Store`] for unit tests.

use crate::{
    common::{self, condition::Condition},
    config::Config,
    error::{Error, Result},
    read,
    store::{Item, Page, Store},
    write,
};

use parking_lot::Mutex;
use serde_json::Value;
use std::{cmp, collections, time};

type ItemKey = (String, String);

#[derive(Debug, Default)]
struct State {
    items: collections::BTreeMap<ItemKey, Item>,
    transactions: usize,
    transaction_sizes: Vec<usize>,
    failing_transactions: collections::BTreeSet<usize>,
    queries: Vec<read::query::Query<Value>>,
}

/// Table held in a sorted map, evaluating write conditions like the real store.
#[derive(Debug)]
pub(crate) struct MemoryStore {
    partition_key_name: String,
    sort_key_name: String,
    delay: Option<time::Duration>,
    state: Mutex<State>,
}

impl MemoryStore {
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            partition_key_name: config.partition_key_name.clone(),
            sort_key_name: config.sort_key_name.clone(),
            delay: None,
            state: Mutex::default(),
        }
    }

    /// Every call sleeps for `delay` first.
    pub(crate) fn with_delay(mut self, delay: time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make the `call`th transaction (1-based) fail without writing.
    pub(crate) fn fail_transaction(&self, call: usize) {
        self.state.lock().failing_transactions.insert(call);
    }

    pub(crate) fn transaction_sizes(&self) -> Vec<usize> {
        self.state.lock().transaction_sizes.clone()
    }

    pub(crate) fn queries(&self) -> Vec<read::query::Query<Value>> {
        self.state.lock().queries.clone()
    }

    /// Sort keys stored under `partition`, in order.
    pub(crate) fn sort_keys(&self, partition: &str) -> Vec<String> {
        self.state
            .lock()
            .items
            .keys()
            .filter(|(partition_key, _)| partition_key == partition)
            .map(|(_, sort_key)| sort_key.clone())
            .collect()
    }

    pub(crate) fn item(&self, partition: &str, sort_key: &str) -> Option<Item> {
        self.state
            .lock()
            .items
            .get(&(partition.to_string(), sort_key.to_string()))
            .cloned()
    }

    /// Store `item` as is, bypassing conditions.
    pub(crate) fn put_raw(&self, item: Item) {
        if let Ok(key) = self.item_key(&item) {
            self.state.lock().items.insert(key, item);
        }
    }

    pub(crate) fn remove_raw(&self, partition: &str, sort_key: &str) {
        self.state
            .lock()
            .items
            .remove(&(partition.to_string(), sort_key.to_string()));
    }

    fn item_key(&self, item: &Item) -> Result<ItemKey> {
        let part = |name: &str| {
            item.get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| Error::Store {
                    message: format!("missing string key attribute {name:?}"),
                    retryable: false,
                })
        };
        Ok((
            part(&self.partition_key_name)?,
            part(&self.sort_key_name)?,
        ))
    }

    fn keys_key(&self, keys: &common::key::Keys<Value>) -> Result<ItemKey> {
        self.item_key(&keys.to_item())
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn compare(left: &Value, right: &Value) -> Option<cmp::Ordering> {
    match (left, right) {
        (Value::String(left), Value::String(right)) => Some(left.as_bytes().cmp(right.as_bytes())),
        (Value::Number(left), Value::Number(right)) => left.as_f64()?.partial_cmp(&right.as_f64()?),
        _ => None,
    }
}

/// Whether an attribute holding `attribute` (`None` when absent) satisfies `condition`.
///
/// Strings compare by UTF-8 bytes, as the store orders sort keys.
fn matches(condition: &Condition<Value>, attribute: Option<&Value>) -> bool {
    match (condition, attribute) {
        (Condition::Null, attribute) => attribute.is_none(),
        (Condition::NotNull, attribute) => attribute.is_some(),
        (_, None) => false,
        (Condition::BeginsWith(prefix), Some(Value::String(value))) => {
            value.starts_with(prefix.as_str())
        }
        (Condition::BeginsWith(_), Some(_)) => false,
        (Condition::Equals(expected), Some(value)) => {
            compare(value, expected) == Some(cmp::Ordering::Equal) || value == expected
        }
        (Condition::Between(low, high), Some(value)) => {
            matches!(
                compare(value, low),
                Some(cmp::Ordering::Greater | cmp::Ordering::Equal)
            ) && matches!(
                compare(value, high),
                Some(cmp::Ordering::Less | cmp::Ordering::Equal)
            )
        }
    }
}

fn passes(
    conditions: &[common::condition::KeyCondition<Value>],
    existing: Option<&Item>,
) -> bool {
    conditions.iter().all(|key_condition| {
        matches(
            &key_condition.condition,
            existing.and_then(|item| item.get(&key_condition.name)),
        )
    })
}

impl Store for MemoryStore {
    async fn get_item(&self, get_item: read::get_item::GetItem<Value>) -> Result<Option<Item>> {
        self.pause().await;
        let key = self.keys_key(&get_item.keys)?;
        Ok(self.state.lock().items.get(&key).cloned())
    }

    async fn query(&self, query: read::query::Query<Value>) -> Result<Page> {
        self.pause().await;
        let mut state = self.state.lock();
        state.queries.push(query.clone());
        let partition = query
            .partition_key
            .value
            .as_str()
            .unwrap_or_default()
            .to_string();
        let forward = query.scan_index_forward.unwrap_or(true);
        let start = query
            .multiple_read_args
            .exclusive_start_key
            .as_ref()
            .and_then(|key| key.get(&self.sort_key_name))
            .and_then(Value::as_str)
            .map(str::to_string);
        let mut rows: Vec<(&ItemKey, &Item)> = state
            .items
            .iter()
            .filter(|((partition_key, sort_key), _)| {
                partition_key == &partition
                    && query.sort_key_condition.as_ref().is_none_or(|condition| {
                        matches(&condition.condition, Some(&Value::String(sort_key.clone())))
                    })
            })
            .collect();
        if !forward {
            rows.reverse();
        }
        let rows = rows.into_iter().filter(|((_, sort_key), _)| match &start {
            Some(start) if forward => sort_key.as_bytes() > start.as_bytes(),
            Some(start) => sort_key.as_bytes() < start.as_bytes(),
            None => true,
        });
        let limit = query
            .multiple_read_args
            .limit
            .and_then(|limit| usize::try_from(limit).ok())
            .unwrap_or(usize::MAX);
        let items: Vec<Item> = rows.take(limit).map(|(_, item)| item.clone()).collect();
        let last_evaluated_key = match items.last() {
            Some(last) if items.len() == limit => {
                let mut key = Item::new();
                for name in [&self.partition_key_name, &self.sort_key_name] {
                    if let Some(value) = last.get(name) {
                        key.insert(name.clone(), value.clone());
                    }
                }
                Some(key)
            }
            _ => None,
        };
        Ok(Page {
            items,
            last_evaluated_key,
        })
    }

    async fn batch_get_item(
        &self,
        batch_get_item: read::batch_get_item::BatchGetItem<Value>,
    ) -> Result<Vec<Item>> {
        self.pause().await;
        let mut seen = collections::BTreeSet::new();
        let mut items = Vec::new();
        let state = self.state.lock();
        for keys in &batch_get_item.keys {
            let key = self.keys_key(keys)?;
            if !seen.insert(key.clone()) {
                return Err(Error::Store {
                    message: "provided list of item keys contains duplicates".to_string(),
                    retryable: false,
                });
            }
            if let Some(item) = state.items.get(&key) {
                items.push(item.clone());
            }
        }
        // the real store answers in no particular order
        items.reverse();
        Ok(items)
    }

    async fn transact_write_items(
        &self,
        transact_write_items: write::transact_write_items::TransactWriteItems<Value>,
    ) -> Result<()> {
        self.pause().await;
        let mut state = self.state.lock();
        state.transactions += 1;
        state.transaction_sizes.push(transact_write_items.len());
        if state.failing_transactions.contains(&state.transactions) {
            return Err(Error::Store {
                message: "injected transaction failure".to_string(),
                retryable: false,
            });
        }
        if transact_write_items.len() > write::transact_write_items::MAX_TRANSACT_ITEMS {
            return Err(Error::Store {
                message: "too many items in one transaction".to_string(),
                retryable: false,
            });
        }
        let mut writes = Vec::with_capacity(transact_write_items.len());
        let mut touched = collections::BTreeSet::new();
        for transact_write_item in transact_write_items.items {
            let (key, item, conditions) = match transact_write_item {
                write::transact_write_items::TransactWriteItem::Put(put_item) => {
                    let Value::Object(item) = put_item.item else {
                        return Err(Error::Store {
                            message: "put item is not a map".to_string(),
                            retryable: false,
                        });
                    };
                    (self.item_key(&item)?, Some(item), put_item.write_args.conditions)
                }
                write::transact_write_items::TransactWriteItem::Delete(delete_item) => (
                    self.keys_key(&delete_item.keys)?,
                    None,
                    delete_item.write_args.conditions,
                ),
            };
            if !touched.insert(key.clone()) {
                return Err(Error::Store {
                    message: "transaction touches one item more than once".to_string(),
                    retryable: false,
                });
            }
            if !passes(&conditions, state.items.get(&key)) {
                return Err(Error::Conflict(
                    "transaction cancelled: ConditionalCheckFailed".to_string(),
                ));
            }
            writes.push((key, item));
        }
        for (key, item) in writes {
            match item {
                Some(item) => state.items.insert(key, item),
                None => state.items.remove(&key),
            };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case::null_absent(Condition::Null, None, true)]
    #[case::null_present(Condition::Null, Some(json!("x")), false)]
    #[case::not_null_present(Condition::NotNull, Some(json!("x")), true)]
    #[case::begins_with(Condition::BeginsWith("name#".to_string()), Some(json!("name#a#id#1")), true)]
    #[case::begins_with_miss(Condition::BeginsWith("name#b".to_string()), Some(json!("name#a#id#1")), false)]
    #[case::begins_with_absent(Condition::BeginsWith("a".to_string()), None, false)]
    #[case::equals_number(Condition::Equals(json!(3)), Some(json!(3.0)), true)]
    #[case::equals_miss(Condition::Equals(json!(3)), Some(json!(4)), false)]
    #[case::between_inclusive(Condition::Between(json!("a"), json!("c")), Some(json!("c")), true)]
    #[case::between_below(Condition::Between(json!("b"), json!("c")), Some(json!("a")), false)]
    #[case::between_byte_order(Condition::Between(json!("a#"), json!("a#\u{10FFFF}")), Some(json!("a#\u{FFFF}")), true)]
    fn test_matches(
        #[case] condition: Condition<Value>,
        #[case] attribute: Option<Value>,
        #[case] expected: bool,
    ) {
        assert_eq!(matches(&condition, attribute.as_ref()), expected);
    }
}
