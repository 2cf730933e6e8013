//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Key model
//! - Source objects live under dotted keys (`140847.5`); every derived
//!   artifact appends one stage (`140847.5.0`), mirrored by its `Lineage`.
//! - Epoch-seconds timestamps (f64) are the primary clock for day routing.

mod bucket_id;
mod config;
mod document;
mod error;
mod lineage;
mod sink;
mod source_block;
mod store;
mod transformer;
mod transport;

pub use bucket_id::BucketId;
pub use config::*;
pub use document::Document;
pub use error::ContractError;
pub use lineage::{Lineage, LineageQuery};
pub use sink::{Destination, IndexSink};
pub use source_block::SourceBlock;
pub use store::{Bucket, BucketProvider, IndexHandle, IndexSettings, SearchCluster, SourceReader};
pub use transformer::Transformer;
pub use transport::{QueueTransport, WorkQueue};
