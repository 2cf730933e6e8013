//! # Integration Tests
//!
//! End-to-end tests over the memory backends:
//! - full two-stage pipeline with fan-out (bucket → bucket → daily index)
//! - reprocessing idempotence across engine runs
//! - fatal startup on unresolvable configuration

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;

    use backends::{MemoryCluster, MemoryQueue, MemoryStores};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{Bucket, BucketProvider, EngineBlueprint, SearchCluster, SourceBlock};
    use dispatcher::{ActionRegistry, EtlEngine, SinkRegistry, TransformerRegistry};

    /// Two-stage pipeline: raw pulse blocks are split into log chunks, the
    /// chunks fan back onto the queue and are loaded into a daily index.
    const PIPELINE_TOML: &str = r#"
[work_queue]
name = "etl"

[param]
threads = 2

[[workers]]
name = "pulse2unittest"
transformer = "line_split"

[workers.source]
bucket = "raw-pulse"

[workers.destination]
type = "bucket"
bucket = "unittest-logs"

[[workers]]
name = "unittest2es"
transformer = "json_to_index"

[workers.source]
bucket = "unittest-logs"

[workers.destination]
type = "index"
index = "unittest"
batch_size = 10
max_queue_size = 100
"#;

    const DAY1: i64 = 1_577_836_800; // 2020-01-01T00:00:00Z
    const DAY2: i64 = 1_577_923_200; // 2020-01-02T00:00:00Z

    struct Harness {
        blueprint: EngineBlueprint,
        stores: Arc<MemoryStores>,
        cluster: Arc<MemoryCluster>,
        queue: MemoryQueue,
    }

    impl Harness {
        async fn new() -> Self {
            let blueprint =
                ConfigLoader::load_from_str(PIPELINE_TOML, ConfigFormat::Toml).unwrap();
            let stores = Arc::new(MemoryStores::new());
            let cluster = Arc::new(MemoryCluster::new());
            let queue = MemoryQueue::new("etl");
            Self {
                blueprint,
                stores,
                cluster,
                queue,
            }
        }

        /// Build a fresh engine over the shared backends and drain the queue.
        async fn drain(&self) -> dispatcher::EngineMetricsSnapshot {
            let transformers = TransformerRegistry::with_builtin();
            let sinks = SinkRegistry::new(
                Arc::clone(&self.stores) as Arc<dyn BucketProvider>,
                Arc::clone(&self.cluster) as Arc<dyn SearchCluster>,
            );
            let registry = ActionRegistry::build(&self.blueprint, &transformers, &sinks)
                .await
                .unwrap();
            let engine = EtlEngine::new(registry, self.blueprint.param.clone());
            engine.run(&self.queue).await;

            // Batched index writers flush asynchronously
            tokio::time::sleep(Duration::from_millis(100)).await;
            engine.metrics().snapshot()
        }
    }

    fn pulse_line(result: &str, date: i64) -> String {
        serde_json::json!({"result": result, "build": {"date": date}}).to_string()
    }

    #[tokio::test]
    async fn test_two_stage_pipeline_with_fanout() {
        let harness = Harness::new().await;

        let payload = [
            pulse_line("pass", DAY1),
            pulse_line("fail", DAY1 + 60),
            pulse_line("pass", DAY2),
        ]
        .join("\n");
        harness
            .stores
            .bucket("raw-pulse")
            .write("140847.5", Bytes::from(payload))
            .await
            .unwrap();
        harness.queue.push(SourceBlock::new("raw-pulse", "140847.5"));

        let snapshot = harness.drain().await;

        // Stage 1 produced one chunk, which fanned out and was consumed
        let chunks = harness
            .stores
            .bucket("unittest-logs")
            .keys("140847.5")
            .await
            .unwrap();
        assert_eq!(chunks.into_iter().collect::<Vec<_>>(), vec!["140847.5.0"]);
        assert_eq!(snapshot.committed, 2);
        assert_eq!(snapshot.fanout, 1);
        assert_eq!(snapshot.rolled_back, 0);
        assert_eq!(snapshot.failures, 0);

        // Stage 2 routed documents to per-day indices under one alias
        assert_eq!(
            harness.cluster.index_names(),
            vec!["unittest_2020-01-01", "unittest_2020-01-02"]
        );
        let day1 = harness.cluster.index("unittest_2020-01-01").unwrap();
        let day2 = harness.cluster.index("unittest_2020-01-02").unwrap();
        assert!(day1.has_alias("unittest") && day2.has_alias("unittest"));
        assert_eq!(day1.doc_count(), 2);
        assert_eq!(day2.doc_count(), 1);

        // Document ids extend the chunk's lineage
        assert_eq!(
            day1.doc_ids().into_iter().collect::<Vec<_>>(),
            vec!["140847.5.0.0", "140847.5.0.1"]
        );
    }

    #[tokio::test]
    async fn test_reprocessing_is_idempotent() {
        let harness = Harness::new().await;

        let payload = [pulse_line("pass", DAY1), pulse_line("fail", DAY1)].join("\n");
        harness
            .stores
            .bucket("raw-pulse")
            .write("140850.0", Bytes::from(payload))
            .await
            .unwrap();

        harness.queue.push(SourceBlock::new("raw-pulse", "140850.0"));
        let first = harness.drain().await;
        assert_eq!(first.stale_keys, 0);

        // Redeliver the same block; the second run observes the first run's
        // destination state and reproduces exactly the same keys.
        harness.queue.push(SourceBlock::new("raw-pulse", "140850.0"));
        let second = harness.drain().await;

        assert_eq!(second.stale_keys, 0);
        assert_eq!(second.failures, 0);
        let day1 = harness.cluster.index("unittest_2020-01-01").unwrap();
        assert_eq!(day1.doc_count(), 2);
    }

    #[tokio::test]
    async fn test_multi_key_block_processes_as_one_source() {
        let harness = Harness::new().await;

        harness
            .stores
            .bucket("raw-pulse")
            .write("140860.2", Bytes::from(pulse_line("fail", DAY1)))
            .await
            .unwrap();
        harness
            .stores
            .bucket("raw-pulse")
            .write("140860.1", Bytes::from(pulse_line("pass", DAY1)))
            .await
            .unwrap();

        harness.queue.push(SourceBlock::with_keys(
            "raw-pulse",
            vec!["140860.2".into(), "140860.1".into()],
        ));
        let snapshot = harness.drain().await;
        assert_eq!(snapshot.failures, 0);

        // Chunks derive from the canonical (minimum) key and hold both lines
        let chunks = harness
            .stores
            .bucket("unittest-logs")
            .keys("140860.1")
            .await
            .unwrap();
        assert_eq!(chunks.into_iter().collect::<Vec<_>>(), vec!["140860.1.0"]);
        let day1 = harness.cluster.index("unittest_2020-01-01").unwrap();
        assert_eq!(day1.doc_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_transformer_is_fatal_at_startup() {
        let toml = r#"
[work_queue]
name = "etl"

[[workers]]
name = "broken"
transformer = "no_such_transform"

[workers.source]
bucket = "raw"

[workers.destination]
type = "bucket"
bucket = "out"
"#;
        let blueprint = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        let sinks = SinkRegistry::new(
            Arc::new(MemoryStores::new()) as Arc<dyn BucketProvider>,
            Arc::new(MemoryCluster::new()) as Arc<dyn SearchCluster>,
        );
        let err =
            ActionRegistry::build(&blueprint, &TransformerRegistry::with_builtin(), &sinks)
                .await
                .unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("no_such_transform"));
    }
}
