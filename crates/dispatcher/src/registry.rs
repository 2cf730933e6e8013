//! Action resolution - transformer registry and action registry
//!
//! Transformers are resolved by name from a static table at startup; an
//! unknown name is a hard startup error and no partial registry is built.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument};

use contracts::{
    BucketId, ContractError, Destination, EngineBlueprint, SinkConfig, Transformer,
};

use crate::error::DispatcherError;
use crate::sinks::SinkRegistry;

/// Static table mapping transformer names to implementations.
#[derive(Default)]
pub struct TransformerRegistry {
    transformers: HashMap<String, Arc<dyn Transformer>>,
}

impl TransformerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the bundled transforms.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::transforms::LineSplitTransform::default()));
        registry.register(Arc::new(crate::transforms::JsonToIndexTransform::default()));
        registry
    }

    /// Register a transformer under its own name; the last registration for
    /// a name wins.
    pub fn register(&mut self, transformer: Arc<dyn Transformer>) {
        self.transformers
            .insert(transformer.name().to_string(), transformer);
    }

    /// Look up a transformer by name.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Transformer>> {
        self.transformers.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.transformers.keys().cloned().collect();
        names.sort();
        names
    }
}

/// One configured binding: source bucket → transformer → destination sink.
/// Immutable once the engine starts.
pub struct Action {
    pub name: String,
    pub source_bucket: BucketId,
    pub source: Arc<dyn contracts::Bucket>,
    pub transformer: Arc<dyn Transformer>,
    pub destination: Destination,
    /// Fan-out target for blob destinations
    pub destination_bucket: Option<BucketId>,
    /// Delete stale keys after reconciliation (stale keys are always logged)
    pub delete_stale: bool,
}

/// All configured actions, looked up by source bucket during dispatch.
pub struct ActionRegistry {
    actions: Vec<Action>,
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field(
                "actions",
                &self.actions.iter().map(|a| &a.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ActionRegistry {
    /// Resolve every worker entry. Fails fast on the first unresolvable
    /// transformer or sink - a partial registry is never returned.
    #[instrument(name = "action_registry_build", skip_all, fields(workers = blueprint.workers.len()))]
    pub async fn build(
        blueprint: &EngineBlueprint,
        transformers: &TransformerRegistry,
        sinks: &SinkRegistry,
    ) -> Result<Self, DispatcherError> {
        let mut actions = Vec::with_capacity(blueprint.workers.len());

        for worker in &blueprint.workers {
            let transformer = transformers.resolve(&worker.transformer).ok_or_else(|| {
                ContractError::UnknownTransformer {
                    worker: worker.name.clone(),
                    name: worker.transformer.clone(),
                }
            })?;

            let source = sinks
                .resolve(&SinkConfig::Bucket(worker.source.clone()))
                .await?
                .into_bucket()
                .expect("bucket config resolves to a bucket");

            let destination = sinks.resolve(&worker.destination).await?.into_destination();

            info!(
                action = %worker.name,
                source = %worker.source.bucket,
                destination = %worker.destination.identity(),
                transformer = %worker.transformer,
                "action registered"
            );

            actions.push(Action {
                name: worker.name.clone(),
                source_bucket: BucketId::from(worker.source.bucket.as_str()),
                source,
                transformer,
                destination,
                destination_bucket: worker.destination.bucket_id(),
                delete_stale: worker.delete_stale,
            });
        }

        Ok(Self { actions })
    }

    /// All actions whose source bucket matches. Zero matches is a policy
    /// decision for the caller, not an error.
    pub fn actions_for(&self, bucket: &BucketId) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.source_bucket == *bucket)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backends::{MemoryCluster, MemoryStores};
    use contracts::{BucketSinkConfig, EngineParams, IndexSinkConfig, QueueConfig, WorkerConfig};

    fn blueprint(workers: Vec<WorkerConfig>) -> EngineBlueprint {
        EngineBlueprint {
            version: Default::default(),
            work_queue: QueueConfig { name: "etl".into() },
            param: EngineParams::default(),
            workers,
        }
    }

    fn worker(name: &str, transformer: &str, source: &str) -> WorkerConfig {
        WorkerConfig {
            name: name.into(),
            transformer: transformer.into(),
            delete_stale: false,
            source: BucketSinkConfig::named(source),
            destination: SinkConfig::Index(IndexSinkConfig::named("unittest")),
        }
    }

    fn sink_registry() -> SinkRegistry {
        SinkRegistry::new(
            Arc::new(MemoryStores::new()),
            Arc::new(MemoryCluster::new()),
        )
    }

    #[tokio::test]
    async fn test_build_resolves_all_workers() {
        let bp = blueprint(vec![
            worker("a", "json_to_index", "raw"),
            worker("b", "json_to_index", "raw"),
            worker("c", "json_to_index", "other"),
        ]);
        let registry = ActionRegistry::build(
            &bp,
            &TransformerRegistry::with_builtin(),
            &sink_registry(),
        )
        .await
        .unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.actions_for(&BucketId::from("raw")).len(), 2);
        assert_eq!(registry.actions_for(&BucketId::from("other")).len(), 1);
        assert!(registry.actions_for(&BucketId::from("unseen")).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_transformer_fails_fast() {
        let bp = blueprint(vec![
            worker("a", "json_to_index", "raw"),
            worker("b", "does_not_exist", "raw"),
        ]);
        let err = ActionRegistry::build(
            &bp,
            &TransformerRegistry::with_builtin(),
            &sink_registry(),
        )
        .await
        .unwrap_err();

        assert!(err.is_fatal());
        assert!(err.to_string().contains("does_not_exist"));
    }

    #[test]
    fn test_builtin_names() {
        let registry = TransformerRegistry::with_builtin();
        assert_eq!(registry.names(), vec!["json_to_index", "line_split"]);
        assert!(registry.resolve("line_split").is_some());
        assert!(registry.resolve("nope").is_none());
    }
}
