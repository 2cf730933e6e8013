//! BatchedWriter - bounded write queue with a bulk-flushing worker task
//!
//! Senders await queue capacity (backpressure); the worker drains whatever
//! has accumulated, up to the batch size, per bulk write. Flush failures are
//! logged and counted, not propagated: writes are async-decoupled from the
//! dispatch transaction, and redelivery reprocesses idempotently.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use contracts::{ContractError, Document, IndexHandle};

use crate::metrics::WriterMetrics;

/// Handle to a running index writer
pub struct BatchedWriter {
    /// Physical index name
    index_name: String,
    /// Channel to send documents to the worker
    tx: mpsc::Sender<Document>,
    /// Shared metrics
    metrics: Arc<WriterMetrics>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl BatchedWriter {
    /// Create a new BatchedWriter and spawn the worker task
    pub fn spawn(index: Arc<dyn IndexHandle>, max_size: usize, batch_size: usize) -> Self {
        let index_name = index.name().to_string();
        let (tx, rx) = mpsc::channel(max_size.max(1));
        let metrics = Arc::new(WriterMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_handle = tokio::spawn(async move {
            writer_loop(index, rx, batch_size.max(1), worker_metrics).await;
        });

        Self {
            index_name,
            tx,
            metrics,
            worker_handle,
        }
    }

    /// Queue one document, awaiting capacity when the queue is full.
    pub async fn send(&self, document: Document) -> Result<(), ContractError> {
        self.tx.send(document).await.map_err(|_| {
            ContractError::sink_write(&self.index_name, "writer task stopped")
        })?;
        self.metrics
            .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
        Ok(())
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<WriterMetrics> {
        &self.metrics
    }

    /// Shutdown the writer gracefully, flushing the residue.
    #[instrument(name = "batched_writer_shutdown", skip(self), fields(index = %self.index_name))]
    pub async fn shutdown(self) {
        // Drop sender to signal worker to stop
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(index = %self.index_name, error = ?e, "Writer task panicked");
        }
        debug!(index = %self.index_name, "BatchedWriter shutdown complete");
    }
}

/// Worker task that drains the queue and bulk-writes to the index
async fn writer_loop(
    index: Arc<dyn IndexHandle>,
    mut rx: mpsc::Receiver<Document>,
    batch_size: usize,
    metrics: Arc<WriterMetrics>,
) {
    debug!(index = %index.name(), "Writer started");

    let mut batch = Vec::with_capacity(batch_size);
    while let Some(document) = rx.recv().await {
        batch.push(document);
        // Drain whatever is already queued, up to one bulk batch
        while batch.len() < batch_size {
            match rx.try_recv() {
                Ok(document) => batch.push(document),
                Err(_) => break,
            }
        }
        metrics.set_queue_len(rx.len());
        flush(index.as_ref(), &mut batch, &metrics).await;
    }

    debug!(index = %index.name(), "Writer stopped");
}

async fn flush(index: &dyn IndexHandle, batch: &mut Vec<Document>, metrics: &WriterMetrics) {
    let count = batch.len();
    match index.bulk(std::mem::take(batch)).await {
        Ok(()) => {
            metrics.add_docs_written(count);
            metrics.inc_batches_flushed();
        }
        Err(e) => {
            metrics.inc_failure_count();
            error!(
                index = %index.name(),
                docs = count,
                error = %e,
                "Bulk write failed"
            );
            // Continue processing - don't crash on single failure
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use contracts::Lineage;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    /// Mock index for testing
    struct MockIndex {
        name: String,
        doc_count: Arc<AtomicU64>,
        bulk_count: Arc<AtomicU64>,
        should_fail: bool,
    }

    #[async_trait]
    impl IndexHandle for MockIndex {
        fn name(&self) -> &str {
            &self.name
        }

        async fn add_alias(&self, _alias: &str) -> Result<(), ContractError> {
            Ok(())
        }

        async fn set_refresh_interval(
            &self,
            _interval: Duration,
        ) -> Result<(), ContractError> {
            Ok(())
        }

        async fn bulk(&self, documents: Vec<Document>) -> Result<(), ContractError> {
            if self.should_fail {
                return Err(ContractError::sink_write(&self.name, "mock failure"));
            }
            self.doc_count
                .fetch_add(documents.len() as u64, Ordering::Relaxed);
            self.bulk_count.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn delete(&self, _id: &str) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn doc(key: &str) -> Document {
        Document::new(Lineage::parse(key), serde_json::json!({}))
    }

    #[tokio::test]
    async fn test_writer_flushes_all_documents() {
        let doc_count = Arc::new(AtomicU64::new(0));
        let index = Arc::new(MockIndex {
            name: "unittest".to_string(),
            doc_count: Arc::clone(&doc_count),
            bulk_count: Arc::new(AtomicU64::new(0)),
            should_fail: false,
        });

        let writer = BatchedWriter::spawn(index, 100, 10);
        for i in 0..25 {
            writer.send(doc(&format!("a.{i}"))).await.unwrap();
        }
        writer.shutdown().await;

        assert_eq!(doc_count.load(Ordering::Relaxed), 25);
    }

    #[tokio::test]
    async fn test_writer_batches_queued_documents() {
        let bulk_count = Arc::new(AtomicU64::new(0));
        let index = Arc::new(MockIndex {
            name: "unittest".to_string(),
            doc_count: Arc::new(AtomicU64::new(0)),
            bulk_count: Arc::clone(&bulk_count),
            should_fail: false,
        });

        let writer = BatchedWriter::spawn(index, 100, 100);
        for i in 0..50 {
            writer.send(doc(&format!("a.{i}"))).await.unwrap();
        }
        writer.shutdown().await;

        // Far fewer bulk calls than documents
        assert!(bulk_count.load(Ordering::Relaxed) < 50);
        assert!(bulk_count.load(Ordering::Relaxed) >= 1);
    }

    #[tokio::test]
    async fn test_writer_counts_failures() {
        let index = Arc::new(MockIndex {
            name: "unittest".to_string(),
            doc_count: Arc::new(AtomicU64::new(0)),
            bulk_count: Arc::new(AtomicU64::new(0)),
            should_fail: true,
        });

        let writer = BatchedWriter::spawn(index, 10, 1);
        writer.send(doc("a.0")).await.unwrap();
        writer.send(doc("a.1")).await.unwrap();
        // Give worker time to process
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(writer.metrics().failure_count() > 0);
        writer.shutdown().await;
    }
}
