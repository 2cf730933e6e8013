//! EngineBlueprint - Config Loader output
//!
//! Describes the complete engine configuration: work queue, engine
//! parameters, and the worker entries binding source buckets to transformers
//! and destination sinks.

use serde::{Deserialize, Serialize};

use crate::BucketId;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete engine configuration blueprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Work queue settings
    pub work_queue: QueueConfig,

    /// Engine-level parameters
    #[serde(default)]
    pub param: EngineParams,

    /// Worker entries
    pub workers: Vec<WorkerConfig>,
}

/// Work queue settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Logical queue name
    pub name: String,
}

/// Engine-level parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineParams {
    /// Dispatch loop worker count
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Blocking mode: an empty pop is retried instead of stopping the loop
    #[serde(default)]
    pub wait_forever: bool,

    /// Policy for blocks whose bucket matches no action: keep on queue
    /// (rollback, retry later) instead of dropping (commit)
    #[serde(default)]
    pub keep_unknown_on_queue: bool,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            wait_forever: false,
            keep_unknown_on_queue: false,
        }
    }
}

fn default_threads() -> usize {
    1
}

/// One worker entry: source bucket → transformer → destination sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Action name (unique)
    pub name: String,

    /// Transformer registry name
    pub transformer: String,

    /// Delete stale destination keys after reconciliation (off by default;
    /// stale keys are always logged)
    #[serde(default)]
    pub delete_stale: bool,

    /// Source bucket
    pub source: BucketSinkConfig,

    /// Destination sink
    pub destination: SinkConfig,
}

/// Destination sink configuration, resolved by the sink registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Object-store bucket
    Bucket(BucketSinkConfig),
    /// Search index
    Index(IndexSinkConfig),
}

impl SinkConfig {
    /// Sink identity for logs and errors.
    pub fn identity(&self) -> &str {
        match self {
            Self::Bucket(c) => &c.bucket,
            Self::Index(c) => &c.index,
        }
    }

    /// Fan-out target bucket, for blob destinations.
    pub fn bucket_id(&self) -> Option<BucketId> {
        match self {
            Self::Bucket(c) => Some(BucketId::from(c.bucket.as_str())),
            Self::Index(_) => None,
        }
    }

    /// Copy with volatile fields stripped.
    ///
    /// Registry cache hits are decided by total equality over this value, so
    /// incidental drift (request timeout, debug flag) never splits a sink.
    pub fn normalized(&self) -> Self {
        match self {
            Self::Bucket(c) => Self::Bucket(c.normalized()),
            Self::Index(c) => Self::Index(c.normalized()),
        }
    }
}

/// Object-store bucket configuration (source or destination)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSinkConfig {
    /// Bucket name
    pub bucket: String,

    /// Client request timeout (volatile; ignored for cache equality)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Client debug flag (volatile; ignored for cache equality)
    #[serde(default)]
    pub debug: bool,
}

impl BucketSinkConfig {
    /// Bucket config carrying only the name.
    pub fn named(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            timeout_secs: None,
            debug: false,
        }
    }

    /// Copy with volatile fields stripped.
    pub fn normalized(&self) -> Self {
        Self::named(self.bucket.clone())
    }
}

/// Search index sink configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSinkConfig {
    /// Logical index name; day partitions are created as `{index}_{date}`
    /// and aliased back under this name
    pub index: String,

    /// Shard documents across per-day indices (the default); plain batched
    /// indexing otherwise
    #[serde(default = "default_true")]
    pub use_daily: bool,

    /// Timestamp fields tried in order when day-routing a document
    #[serde(default = "default_timestamp_fields")]
    pub timestamp_fields: Vec<String>,

    /// Write queue capacity (documents)
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    /// Bulk write batch size (documents)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Refresh interval applied to day indices (seconds)
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Client request timeout (volatile; ignored for cache equality)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Client debug flag (volatile; ignored for cache equality)
    #[serde(default)]
    pub debug: bool,
}

impl IndexSinkConfig {
    /// Index config carrying only the name, with defaults elsewhere.
    pub fn named(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            use_daily: true,
            timestamp_fields: default_timestamp_fields(),
            max_queue_size: default_max_queue_size(),
            batch_size: default_batch_size(),
            refresh_interval_secs: default_refresh_interval_secs(),
            timeout_secs: None,
            debug: false,
        }
    }

    /// Copy with volatile fields stripped.
    pub fn normalized(&self) -> Self {
        Self {
            timeout_secs: None,
            debug: false,
            ..self.clone()
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_timestamp_fields() -> Vec<String> {
    vec!["build.date".to_string(), "run.timestamp".to_string()]
}

fn default_max_queue_size() -> usize {
    2000
}

fn default_batch_size() -> usize {
    1000
}

fn default_refresh_interval_secs() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_equality_ignores_volatile_fields() {
        let a = SinkConfig::Index(IndexSinkConfig {
            timeout_secs: Some(30),
            debug: true,
            ..IndexSinkConfig::named("unittest")
        });
        let b = SinkConfig::Index(IndexSinkConfig::named("unittest"));

        assert_ne!(a, b);
        assert_eq!(a.normalized(), b.normalized());
    }

    #[test]
    fn test_normalized_equality_keeps_material_fields() {
        let a = SinkConfig::Index(IndexSinkConfig {
            batch_size: 500,
            ..IndexSinkConfig::named("unittest")
        });
        let b = SinkConfig::Index(IndexSinkConfig::named("unittest"));
        assert_ne!(a.normalized(), b.normalized());

        let c = SinkConfig::Bucket(BucketSinkConfig::named("unittest"));
        assert_ne!(b.normalized(), c.normalized());
    }

    #[test]
    fn test_index_defaults() {
        let cfg: IndexSinkConfig = serde_json::from_str(r#"{"index":"jobs"}"#).unwrap();
        assert!(cfg.use_daily);
        assert_eq!(cfg.max_queue_size, 2000);
        assert_eq!(cfg.batch_size, 1000);
        assert_eq!(cfg.refresh_interval_secs, 3600);
        assert_eq!(cfg.timestamp_fields, vec!["build.date", "run.timestamp"]);
    }
}
