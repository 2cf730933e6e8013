//! Bundled reference transforms
//!
//! Real deployments register their own transformers; these two cover the
//! common shapes - blob → blob splitting with fan-out, and blob → index
//! document loading - and give the registry, CLI and tests live entries.

mod json_to_index;
mod line_split;

pub use self::json_to_index::JsonToIndexTransform;
pub use self::line_split::LineSplitTransform;
