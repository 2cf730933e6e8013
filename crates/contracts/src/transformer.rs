//! Transformer trait - the pluggable transform step
//!
//! Business logic lives behind this trait; the engine treats execution as
//! opaque and possibly slow. No timeout is enforced beyond cooperative
//! cancellation: a transformer may observe the stop token, but the engine
//! never interrupts a running transform.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{ContractError, Destination, SourceReader};

/// One transform action implementation.
///
/// Resolved by name from the transformer registry at startup; unknown names
/// are a hard startup error.
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Registry name this transformer resolves under
    fn name(&self) -> &str;

    /// Transform one source object.
    ///
    /// Writes artifacts to `destination` and returns the full set of keys it
    /// produced (possibly empty). The key set is what reconciliation diffs
    /// against previously produced keys, so it must cover every write.
    async fn transform(
        &self,
        source_key: &str,
        source: &mut dyn SourceReader,
        destination: &Destination,
        stop: &CancellationToken,
    ) -> Result<BTreeSet<String>, ContractError>;
}
