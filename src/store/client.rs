use crate::{
    error::{Error, Result},
    read,
    store::{Item, Page, Store},
    write,
};

use aws_sdk_dynamodb::{Client, types};
use serde_dynamo::from_item;
use serde_json::Value;
use std::{collections, time};

/// Retries of unprocessed batch keys before giving up.
const MAX_UNPROCESSED_RETRIES: usize = 5;

/// First backoff delay between retries of unprocessed keys.
const INITIAL_RETRY_DELAY: time::Duration = time::Duration::from_millis(100);

/// Longest backoff delay between retries of unprocessed keys.
const MAX_RETRY_DELAY: time::Duration = time::Duration::from_secs(2);

/// Exponential backoff: `initial * 2^attempt`, capped at `max`.
fn retry_delay(attempt: usize, initial: time::Duration, max: time::Duration) -> time::Duration {
    let factor = 2u32.saturating_pow(u32::try_from(attempt).unwrap_or(u32::MAX));
    initial.saturating_mul(factor).min(max)
}

fn has_keys(request_items: &collections::HashMap<String, types::KeysAndAttributes>) -> bool {
    request_items
        .values()
        .any(|keys_and_attributes| !keys_and_attributes.keys().is_empty())
}

impl Store for Client {
    async fn get_item(&self, get_item: read::get_item::GetItem<Value>) -> Result<Option<Item>> {
        let output = get_item.send(self).await?;
        let item = output.item.map(from_item).transpose()?;
        Ok(item)
    }

    async fn query(&self, query: read::query::Query<Value>) -> Result<Page> {
        let output = query.send(self).await?;
        let items = output
            .items
            .unwrap_or_default()
            .into_iter()
            .map(from_item)
            .collect::<serde_dynamo::Result<Vec<Item>>>()?;
        let last_evaluated_key = output.last_evaluated_key.map(from_item).transpose()?;
        Ok(Page {
            items,
            last_evaluated_key,
        })
    }

    async fn batch_get_item(
        &self,
        batch_get_item: read::batch_get_item::BatchGetItem<Value>,
    ) -> Result<Vec<Item>> {
        let table_name = batch_get_item.single_read_args.table_name.clone();
        let mut items = Vec::with_capacity(batch_get_item.keys.len());
        for keys in batch_get_item
            .keys
            .chunks(read::batch_get_item::MAX_KEYS_PER_REQUEST)
        {
            let request = read::batch_get_item::BatchGetItem {
                keys: keys.to_vec(),
                single_read_args: batch_get_item.single_read_args.clone(),
            };
            let mut output = request.send(self).await?;
            let mut attempt = 0;
            loop {
                let responses = output
                    .responses
                    .take()
                    .and_then(|mut responses| responses.remove(&table_name))
                    .unwrap_or_default();
                for item in responses {
                    items.push(from_item(item)?);
                }
                let Some(unprocessed_keys) = output.unprocessed_keys.take().filter(has_keys)
                else {
                    break;
                };
                if attempt >= MAX_UNPROCESSED_RETRIES {
                    return Err(Error::Store {
                        message: format!(
                            "keys still unprocessed after {MAX_UNPROCESSED_RETRIES} retries"
                        ),
                        retryable: true,
                    });
                }
                crate::event!(
                    debug,
                    attempt,
                    "retrying unprocessed batch get keys"
                );
                tokio::time::sleep(retry_delay(attempt, INITIAL_RETRY_DELAY, MAX_RETRY_DELAY))
                    .await;
                attempt += 1;
                output = Client::batch_get_item(self)
                    .set_request_items(Some(unprocessed_keys))
                    .send()
                    .await?;
            }
        }
        Ok(items)
    }

    async fn transact_write_items(
        &self,
        transact_write_items: write::transact_write_items::TransactWriteItems<Value>,
    ) -> Result<()> {
        if transact_write_items.is_empty() {
            return Ok(());
        }
        transact_write_items.send(self).await?;
        Ok(())
    }
}
