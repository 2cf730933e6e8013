//! BatchedIndexSink - plain (non-partitioned) index destination
//!
//! One underlying index behind a batched write queue. `keys()` reports
//! nothing: only the date-partitioned sink supports lineage lookup, so
//! reconciliation treats every run against a plain index as a first
//! sighting.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use contracts::{ContractError, Document, IndexHandle, IndexSink, IndexSinkConfig};

use crate::sinks::writer::BatchedWriter;

pub struct BatchedIndexSink {
    name: String,
    index: Arc<dyn IndexHandle>,
    writer: BatchedWriter,
}

impl BatchedIndexSink {
    pub fn new(config: &IndexSinkConfig, index: Arc<dyn IndexHandle>) -> Self {
        let writer = BatchedWriter::spawn(
            Arc::clone(&index),
            config.max_queue_size,
            config.batch_size,
        );
        Self {
            name: config.index.clone(),
            index,
            writer,
        }
    }
}

#[async_trait]
impl IndexSink for BatchedIndexSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add(&self, document: Document) -> Result<(), ContractError> {
        self.writer.send(document).await
    }

    async fn extend(&self, documents: Vec<Document>) -> Result<(), ContractError> {
        for document in documents {
            self.writer.send(document).await?;
        }
        Ok(())
    }

    async fn keys(&self, _prefix: &str) -> Result<BTreeSet<String>, ContractError> {
        Ok(BTreeSet::new())
    }

    async fn delete(&self, key: &str) -> Result<(), ContractError> {
        self.index.delete(key).await
    }
}
