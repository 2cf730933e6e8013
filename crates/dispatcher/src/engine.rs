//! EtlEngine - the dispatch loop worker pool
//!
//! Each worker owns one queue handle and runs the pop → dispatch →
//! commit|rollback state machine until the queue drains (drain mode) or the
//! stop token fires (blocking mode). Cancellation is only observed between
//! messages, never mid-transaction.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use contracts::{ContractError, EngineParams, QueueTransport, SourceBlock};

use crate::dispatch::dispatch_block;
use crate::metrics::EngineMetrics;
use crate::registry::ActionRegistry;

/// Wait per blocking-mode pop; an empty result is retried, not a stop signal.
pub const EXTRA_WAIT_TIME: Duration = Duration::from_secs(20);

/// Shared engine state handed to every worker.
pub struct EtlEngine {
    registry: Arc<ActionRegistry>,
    params: EngineParams,
    metrics: Arc<EngineMetrics>,
    stop: CancellationToken,
}

impl EtlEngine {
    pub fn new(registry: ActionRegistry, params: EngineParams) -> Self {
        Self {
            registry: Arc::new(registry),
            params,
            metrics: Arc::new(EngineMetrics::new()),
            stop: CancellationToken::new(),
        }
    }

    /// Token observed between messages and passed through to transformers.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    pub fn metrics(&self) -> Arc<EngineMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Spawn the configured number of workers, each with its own queue handle.
    pub fn spawn_workers(&self, transport: &dyn QueueTransport) -> Vec<JoinHandle<()>> {
        (0..self.params.threads)
            .map(|i| {
                let worker = EtlWorker::new(
                    format!("etl-{i}"),
                    transport.handle(),
                    Arc::clone(&self.registry),
                    self.params.clone(),
                    Arc::clone(&self.metrics),
                    self.stop.clone(),
                );
                tokio::spawn(worker.run())
            })
            .collect()
    }

    /// Run the full pool to completion.
    pub async fn run(&self, transport: &dyn QueueTransport) {
        let workers = self.spawn_workers(transport);
        info!(workers = workers.len(), "engine started");
        for handle in workers {
            if let Err(e) = handle.await {
                error!(error = ?e, "worker task panicked");
            }
        }
        info!("engine stopped");
    }
}

/// One dispatch loop worker.
pub struct EtlWorker {
    name: String,
    queue: Box<dyn contracts::WorkQueue>,
    registry: Arc<ActionRegistry>,
    params: EngineParams,
    metrics: Arc<EngineMetrics>,
    stop: CancellationToken,
}

impl EtlWorker {
    pub fn new(
        name: String,
        queue: Box<dyn contracts::WorkQueue>,
        registry: Arc<ActionRegistry>,
        params: EngineParams,
        metrics: Arc<EngineMetrics>,
        stop: CancellationToken,
    ) -> Self {
        Self {
            name,
            queue,
            registry,
            params,
            metrics,
            stop,
        }
    }

    /// Run until drained or stopped. The queue handle is released on every
    /// exit path.
    #[instrument(name = "etl_worker_run", skip(self), fields(worker = %self.name))]
    pub async fn run(mut self) {
        debug!("worker started");

        if let Err(e) = self.event_loop().await {
            error!(error = %e, "worker stopped on queue transport error");
        }

        if let Err(e) = self.queue.close().await {
            error!(error = %e, "failed to release queue handle");
        }
        debug!("worker stopped");
    }

    async fn event_loop(&mut self) -> Result<(), ContractError> {
        loop {
            if self.stop.is_cancelled() {
                debug!("stop requested");
                return Ok(());
            }

            let Some(block) = self.next_block().await? else {
                if !self.params.wait_forever {
                    debug!("queue drained, nothing left to do");
                }
                return Ok(());
            };

            self.metrics.inc_processed();
            self.process(&block).await?;
        }
    }

    /// Pop the next block.
    ///
    /// Blocking mode retries empty pops until the stop token fires; drain
    /// mode treats an empty pop as "nothing left to do". Cancellation can
    /// interrupt the wait for a message but never a leased one: a lease is
    /// only taken when a pop completes.
    async fn next_block(&mut self) -> Result<Option<SourceBlock>, ContractError> {
        if self.params.wait_forever {
            loop {
                let popped = tokio::select! {
                    biased;
                    _ = self.stop.cancelled() => return Ok(None),
                    result = self.queue.pop(EXTRA_WAIT_TIME) => result?,
                };
                if let Some(block) = popped {
                    return Ok(Some(block));
                }
            }
        } else {
            self.queue.pop(Duration::ZERO).await
        }
    }

    /// One transaction: dispatch, then commit or roll back. Dispatch errors
    /// roll the message back for redelivery - the sole retry mechanism.
    async fn process(&mut self, block: &SourceBlock) -> Result<(), ContractError> {
        match dispatch_block(
            block,
            &self.registry,
            self.queue.as_ref(),
            &self.params,
            &self.metrics,
            &self.stop,
        )
        .await
        {
            Ok(true) => {
                self.queue.commit().await?;
                self.metrics.inc_committed();
            }
            Ok(false) => {
                self.queue.rollback().await?;
                self.metrics.inc_rolled_back();
            }
            Err(e) => {
                self.queue.rollback().await?;
                self.metrics.inc_rolled_back();
                warn!(key = ?block.key, error = %e, "could not process block");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use async_trait::async_trait;
    use backends::{MemoryCluster, MemoryQueue, MemoryStores};
    use bytes::Bytes;

    use contracts::{
        Bucket, BucketSinkConfig, ContractError, Destination, EngineBlueprint, QueueConfig,
        SinkConfig, SourceReader, Transformer, WorkerConfig,
    };

    use crate::registry::TransformerRegistry;
    use crate::sinks::SinkRegistry;

    /// Copies the source object to `{source_key}.0` in the destination.
    struct CopyTransform;

    #[async_trait]
    impl Transformer for CopyTransform {
        fn name(&self) -> &str {
            "copy"
        }

        async fn transform(
            &self,
            source_key: &str,
            source: &mut dyn SourceReader,
            destination: &Destination,
            _stop: &CancellationToken,
        ) -> Result<BTreeSet<String>, ContractError> {
            let Destination::Blob(bucket) = destination else {
                panic!("copy transform writes blobs");
            };
            let content = source.read().await?;
            let key = format!("{source_key}.0");
            bucket.write(&key, Bytes::from(content)).await?;
            Ok(BTreeSet::from([key]))
        }
    }

    async fn engine(stores: &Arc<MemoryStores>, params: EngineParams) -> EtlEngine {
        let mut transformers = TransformerRegistry::new();
        transformers.register(Arc::new(CopyTransform));

        let sinks = SinkRegistry::new(
            Arc::clone(stores) as Arc<dyn contracts::BucketProvider>,
            Arc::new(MemoryCluster::new()),
        );
        let blueprint = EngineBlueprint {
            version: Default::default(),
            work_queue: QueueConfig { name: "etl".into() },
            param: params.clone(),
            workers: vec![WorkerConfig {
                name: "copy".into(),
                transformer: "copy".into(),
                delete_stale: false,
                source: BucketSinkConfig::named("raw"),
                // terminal bucket: no action consumes "done", fan-out blocks
                // are dropped by the unknown-bucket policy
                destination: SinkConfig::Bucket(BucketSinkConfig::named("done")),
            }],
        };
        let registry = ActionRegistry::build(&blueprint, &transformers, &sinks)
            .await
            .unwrap();
        EtlEngine::new(registry, params)
    }

    #[tokio::test]
    async fn test_drain_mode_empty_queue_stops_cleanly() {
        let stores = Arc::new(MemoryStores::new());
        let engine = engine(&stores, EngineParams::default()).await;
        let queue = MemoryQueue::new("etl");

        engine.run(&queue).await;

        let snapshot = engine.metrics().snapshot();
        assert_eq!(snapshot.processed, 0);
        assert_eq!(snapshot.rolled_back, 0);
    }

    #[tokio::test]
    async fn test_drain_mode_processes_backlog_then_stops() {
        let stores = Arc::new(MemoryStores::new());
        for key in ["140847.1", "140847.2"] {
            stores
                .bucket("raw")
                .write(key, Bytes::from_static(b"x"))
                .await
                .unwrap();
        }

        let params = EngineParams {
            threads: 2,
            ..EngineParams::default()
        };
        let engine = engine(&stores, params).await;
        let queue = MemoryQueue::new("etl");
        queue.push(SourceBlock::new("raw", "140847.1"));
        queue.push(SourceBlock::new("raw", "140847.2"));

        engine.run(&queue).await;

        assert!(stores.bucket("done").get_bytes("140847.1.0").is_some());
        assert!(stores.bucket("done").get_bytes("140847.2.0").is_some());
        assert_eq!(queue.backlog(), 0);
        // source messages plus their dropped fan-out blocks
        let snapshot = engine.metrics().snapshot();
        assert_eq!(snapshot.committed, 4);
        assert_eq!(snapshot.unknown, 2);
        assert_eq!(snapshot.fanout, 2);
    }

    #[tokio::test]
    async fn test_blocking_mode_waits_and_stops_on_cancel() {
        let stores = Arc::new(MemoryStores::new());
        stores
            .bucket("raw")
            .write("late.1", Bytes::from_static(b"x"))
            .await
            .unwrap();

        let params = EngineParams {
            wait_forever: true,
            ..EngineParams::default()
        };
        let engine = engine(&stores, params).await;
        let metrics = engine.metrics();
        let stop = engine.stop_token();

        let queue = MemoryQueue::new("etl");
        let workers = engine.spawn_workers(&queue);

        // Push after the worker is already waiting
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push(SourceBlock::new("raw", "late.1"));

        // Wait for the message (and its fan-out block) to be committed
        tokio::time::timeout(Duration::from_secs(5), async {
            while metrics.committed() < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("message was not processed in time");

        stop.cancel();
        for worker in workers {
            tokio::time::timeout(Duration::from_secs(5), worker)
                .await
                .expect("worker did not stop promptly")
                .unwrap();
        }

        assert!(stores.bucket("done").get_bytes("late.1.0").is_some());
    }
}

