//! Pipeline orchestrator - builds and runs the engine from a blueprint
//!
//! Wires the memory backends behind the contracts traits, resolves the
//! transformer/sink/action registries, runs the worker pool, and keeps a
//! backlog monitor going alongside it. Production queue/store clients plug
//! in behind the same traits.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use backends::{MemoryCluster, MemoryQueue, MemoryStores};
use contracts::{Bucket, BucketProvider, EngineBlueprint, SearchCluster, SourceBlock};
use dispatcher::{ActionRegistry, EtlEngine, SinkRegistry, TransformerRegistry};

use crate::error::CliError;
use crate::pipeline::PipelineStats;

/// How often the backlog monitor reports.
const MONITOR_INTERVAL: Duration = Duration::from_secs(10);

/// Everything needed to run the engine once.
pub struct PipelineConfig {
    pub blueprint: EngineBlueprint,
    /// One-shot reprocessing: seed this key and drain
    pub one_shot_id: Option<String>,
    /// Prometheus port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// One assembled engine run.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the engine to completion. The stop token ends blocking-mode
    /// workers between messages; drain mode ends on its own.
    pub async fn run(self, stop: CancellationToken) -> Result<PipelineStats> {
        let started = Instant::now();
        let blueprint = self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
        }

        let stores = Arc::new(MemoryStores::new());
        let cluster = Arc::new(MemoryCluster::new());
        let transformers = TransformerRegistry::with_builtin();
        let sinks = SinkRegistry::new(
            Arc::clone(&stores) as Arc<dyn BucketProvider>,
            cluster as Arc<dyn SearchCluster>,
        );

        let registry = ActionRegistry::build(&blueprint, &transformers, &sinks)
            .await
            .context("Failed to build action registry")?;
        info!(actions = registry.len(), "action registry built");

        let queue = MemoryQueue::new(&blueprint.work_queue.name);
        if let Some(id) = &self.config.one_shot_id {
            seed_one_shot(&stores, &blueprint, &queue, id).await?;
        }

        let engine = EtlEngine::new(registry, blueprint.param.clone());
        let metrics = engine.metrics();

        // Forward external shutdown to the engine's own token
        let engine_stop = engine.stop_token();
        let forward = tokio::spawn({
            let stop = stop.clone();
            async move {
                stop.cancelled().await;
                warn!("shutdown requested, stopping workers between messages");
                engine_stop.cancel();
            }
        });

        let monitor = spawn_monitor(
            queue.clone(),
            blueprint.work_queue.name.clone(),
            Arc::clone(&metrics),
            stop.clone(),
        );

        engine.run(&queue).await;

        stop.cancel();
        forward.await.ok();
        monitor.await.ok();

        let snapshot = metrics.snapshot();
        observability::record_engine_progress(&progress_of(&snapshot));
        Ok(PipelineStats::new(snapshot, started.elapsed()))
    }
}

fn progress_of(snapshot: &dispatcher::EngineMetricsSnapshot) -> observability::EngineProgress {
    observability::EngineProgress {
        processed: snapshot.processed,
        committed: snapshot.committed,
        rolled_back: snapshot.rolled_back,
        unknown: snapshot.unknown,
        anomalies: snapshot.anomalies,
        stale_keys: snapshot.stale_keys,
        deleted_keys: snapshot.deleted_keys,
        fanout: snapshot.fanout,
        failures: snapshot.failures,
    }
}

/// Resolve `--id` against the first worker's source bucket and enqueue one
/// block: exact key, or unique-prefix lookup.
async fn seed_one_shot(
    stores: &MemoryStores,
    blueprint: &EngineBlueprint,
    queue: &MemoryQueue,
    id: &str,
) -> Result<(), CliError> {
    let worker = blueprint
        .workers
        .first()
        .ok_or_else(|| CliError::id_lookup(id, "no workers configured"))?;
    let bucket = stores.bucket(&worker.source.bucket);

    let key = if bucket.get_bytes(id).is_some() {
        id.to_string()
    } else {
        let matches = bucket
            .keys(id)
            .await
            .map_err(|e| CliError::id_lookup(id, e.to_string()))?;
        match matches.len() {
            1 => matches.into_iter().next().expect("one match"),
            0 => return Err(CliError::id_lookup(id, "key not found in source bucket")),
            n => {
                return Err(CliError::id_lookup(
                    id,
                    format!("prefix matches {n} keys, need exactly one"),
                ))
            }
        }
    };

    info!(bucket = %worker.source.bucket, key = %key, "seeding one-shot block");
    queue.push(SourceBlock::new(worker.source.bucket.as_str(), key));
    Ok(())
}

/// Log and export the queue backlog and engine progress until the run ends.
fn spawn_monitor(
    queue: MemoryQueue,
    name: String,
    metrics: Arc<dispatcher::EngineMetrics>,
    stop: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = tokio::time::sleep(MONITOR_INTERVAL) => {
                    let backlog = queue.backlog();
                    info!(queue = %name, remaining = backlog, "queue backlog");
                    observability::record_queue_backlog(&name, backlog);
                    observability::record_engine_progress(&progress_of(&metrics.snapshot()));
                }
            }
        }
    })
}
