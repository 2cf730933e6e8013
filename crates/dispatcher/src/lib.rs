//! # Dispatcher
//!
//! The ETL engine: queue-consumption workers, action resolution,
//! reconciliation against prior artifacts, fan-out, and the destination
//! sinks with real state (sink registry, date-partitioned index, batched
//! writers).

pub mod concat;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod reconcile;
pub mod registry;
pub mod sinks;
pub mod transforms;

pub use concat::ConcatSource;
pub use dispatch::dispatch_block;
pub use engine::{EtlEngine, EtlWorker, EXTRA_WAIT_TIME};
pub use error::DispatcherError;
pub use metrics::{EngineMetrics, EngineMetricsSnapshot, WriterMetrics};
pub use reconcile::Reconciliation;
pub use registry::{Action, ActionRegistry, TransformerRegistry};
pub use sinks::{BatchedIndexSink, BatchedWriter, DatePartitionedSink, Resolved, SinkRegistry};
pub use transforms::{JsonToIndexTransform, LineSplitTransform};
