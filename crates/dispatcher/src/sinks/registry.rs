//! SinkRegistry - resolves sink configurations to live handles
//!
//! `resolve` is idempotent for equivalent configs: entries are compared by
//! total equality over the normalized config value (volatile fields
//! stripped), under one lock held across the whole compare-and-create
//! section. A linear scan is deliberate - the registry holds a handful of
//! entries for the process lifetime.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, instrument};

use contracts::{
    Bucket, BucketProvider, Destination, IndexSettings, IndexSink, SearchCluster, SinkConfig,
};

use crate::error::DispatcherError;
use crate::sinks::daily::DatePartitionedSink;
use crate::sinks::index::BatchedIndexSink;

/// A resolved container: source bucket, blob destination, or index destination.
#[derive(Clone)]
pub enum Resolved {
    Bucket(Arc<dyn Bucket>),
    Index(Arc<dyn IndexSink>),
}

impl Resolved {
    pub fn into_destination(self) -> Destination {
        match self {
            Self::Bucket(bucket) => Destination::Blob(bucket),
            Self::Index(sink) => Destination::Index(sink),
        }
    }

    /// The bucket half, for source containers.
    pub fn into_bucket(self) -> Option<Arc<dyn Bucket>> {
        match self {
            Self::Bucket(bucket) => Some(bucket),
            Self::Index(_) => None,
        }
    }
}

/// Engine-owned sink cache; actions hold non-owning references to the
/// handles it creates.
pub struct SinkRegistry {
    buckets: Arc<dyn BucketProvider>,
    cluster: Arc<dyn SearchCluster>,
    entries: Mutex<Vec<(SinkConfig, Resolved)>>,
}

impl SinkRegistry {
    pub fn new(buckets: Arc<dyn BucketProvider>, cluster: Arc<dyn SearchCluster>) -> Self {
        Self {
            buckets,
            cluster,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Resolve a config to a live handle, reusing an existing handle for any
    /// equivalent config.
    #[instrument(name = "sink_registry_resolve", skip(self, config), fields(sink = config.identity()))]
    pub async fn resolve(&self, config: &SinkConfig) -> Result<Resolved, DispatcherError> {
        let normalized = config.normalized();

        let mut entries = self.entries.lock().await;
        for (cached, resolved) in entries.iter() {
            if *cached == normalized {
                return Ok(resolved.clone());
            }
        }

        // Still under the lock: a concurrent resolve of the same config must
        // not create a second handle.
        let resolved = self.create(config).await?;
        entries.push((normalized, resolved.clone()));
        debug!(sink = config.identity(), entries = entries.len(), "sink created");
        Ok(resolved)
    }

    async fn create(&self, config: &SinkConfig) -> Result<Resolved, DispatcherError> {
        match config {
            SinkConfig::Bucket(cfg) => {
                let bucket = self.buckets.open_bucket(cfg).await.map_err(|e| {
                    DispatcherError::sink_creation(&cfg.bucket, e.to_string())
                })?;
                Ok(Resolved::Bucket(bucket))
            }
            SinkConfig::Index(cfg) => {
                if cfg.use_daily {
                    Ok(Resolved::Index(Arc::new(DatePartitionedSink::new(
                        cfg.clone(),
                        Arc::clone(&self.cluster),
                    ))))
                } else {
                    let index = self
                        .cluster
                        .get_or_create_index(&cfg.index, &IndexSettings::default())
                        .await
                        .map_err(|e| {
                            DispatcherError::sink_creation(&cfg.index, e.to_string())
                        })?;
                    Ok(Resolved::Index(Arc::new(BatchedIndexSink::new(cfg, index))))
                }
            }
        }
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
