//! Sink implementations and the sink registry
//!
//! Contains the date-partitioned sink, the plain batched index sink, the
//! batched writer they share, and the registry that caches resolved handles.

mod daily;
mod index;
mod registry;
mod writer;

pub use self::daily::DatePartitionedSink;
pub use self::index::BatchedIndexSink;
pub use self::registry::{Resolved, SinkRegistry};
pub use self::writer::BatchedWriter;
