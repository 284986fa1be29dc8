use crate::{
    error::{Error, OperationError, Result},
    resource::{self, chunk},
    store::Store,
    write,
};

use futures::{StreamExt as _, stream};
use serde::Serialize;
use serde_json::Value;
use std::{
    collections,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

/// Stops a bulk call from starting further chunks.
///
/// Chunks already sent to the store still complete.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A flag that is not raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether the flag was raised.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-record outcome of a bulk call, keyed by input position.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BulkOutput {
    /// Documents written, or removed for deletes.
    pub items: collections::BTreeMap<usize, Value>,
    /// Records that failed.
    pub errors: collections::BTreeMap<usize, OperationError>,
}

impl BulkOutput {
    /// Record the failure of the input at `index`.
    pub fn fail(&mut self, index: usize, id: Option<String>, error: &Error) {
        self.errors.insert(index, OperationError::new(id, error));
    }

    /// Whether every record succeeded.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// `self` when every record succeeded, a partial failure carrying `self` otherwise.
    pub fn into_result(self, total: usize) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        Err(Error::PartialFailure {
            failed: self.errors.len(),
            total,
            details: serde_json::to_value(&self)?,
        })
    }
}

/// A record ready to be written.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Prepared {
    /// Input position.
    pub(crate) index: usize,
    pub(crate) id: String,
    /// Document reported on success.
    pub(crate) document: Value,
    pub(crate) items: Vec<write::transact_write_items::TransactWriteItem<Value>>,
}

impl<S: Store> resource::Resource<'_, S> {
    /// Pack `prepared` into transactions and run them, recording every outcome
    /// into `output`.
    ///
    /// A failed chunk fails each of its records with the chunk's error, mapped by
    /// `map_error`; later chunks still run.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub(crate) async fn execute_bulk(
        &self,
        operation: &str,
        prepared: Vec<Prepared>,
        output: &mut BulkOutput,
        cancel: &CancelFlag,
        map_error: impl Fn(Error) -> Error,
    ) -> Result<()> {
        let chunks = chunk::chunk(prepared, self.config.max_transaction_items, |record| {
            record.items.len()
        })?;
        crate::event!(
            debug,
            resource = %self.name,
            operation,
            chunks = chunks.len(),
            "prepared bulk chunks"
        );
        let results: Vec<(Vec<(usize, String, Value)>, Result<()>)> =
            stream::iter(chunks.into_iter().enumerate().map(|(number, chunk)| async move {
                let mut records = Vec::with_capacity(chunk.len());
                let mut items = Vec::new();
                for record in chunk {
                    items.extend(record.items);
                    records.push((record.index, record.id, record.document));
                }
                if cancel.is_cancelled() {
                    crate::event!(debug, chunk = number, "skipping cancelled chunk");
                    return (records, Err(Error::Internal("cancelled".to_string())));
                }
                let size = items.len();
                let result = self.transact(items).await;
                match &result {
                    Ok(()) => crate::event!(debug, chunk = number, size, "chunk committed"),
                    Err(err) => crate::event!(warn, chunk = number, size, %err, "chunk failed"),
                }
                (records, result)
            }))
            .buffered(self.config.chunk_concurrency.max(1))
            .collect()
            .await;
        for (records, result) in results {
            match result {
                Ok(()) => {
                    for (index, _, document) in records {
                        output.items.insert(index, document);
                    }
                }
                Err(err) => {
                    let err = map_error(err);
                    for (index, id, _) in records {
                        output.fail(index, Some(id), &err);
                    }
                }
            }
        }
        if !output.is_success() {
            crate::event!(
                warn,
                resource = %self.name,
                operation,
                failed = output.errors.len(),
                succeeded = output.items.len(),
                "bulk call partially failed"
            );
        }
        Ok(())
    }
}
