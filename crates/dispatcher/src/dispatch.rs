//! Dispatch - the per-message core algorithm
//!
//! Normalize the block's keys, run every matching action (transform →
//! reconcile → fan-out), and decide whether the message commits. Every
//! matching action is attempted even when an earlier one fails; any failure
//! still aborts the whole dispatch so the message rolls back and redelivery
//! reprocesses idempotently.

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use contracts::{
    ContractError, EngineParams, SourceBlock, SourceReader, WorkQueue,
};

use crate::concat::ConcatSource;
use crate::error::DispatcherError;
use crate::metrics::EngineMetrics;
use crate::reconcile;
use crate::registry::{Action, ActionRegistry};

/// Process one source block. Returns whether the message should commit.
#[instrument(
    name = "dispatch_block",
    skip_all,
    fields(bucket = %block.bucket, key = ?block.key)
)]
pub async fn dispatch_block(
    block: &SourceBlock,
    registry: &ActionRegistry,
    queue: &dyn WorkQueue,
    params: &EngineParams,
    metrics: &EngineMetrics,
    stop: &CancellationToken,
) -> Result<bool, DispatcherError> {
    let source_keys = block.normalized_keys()?;

    let actions = registry.actions_for(&block.bucket);
    if actions.is_empty() {
        info!(bucket = %block.bucket, "no action for records from bucket, skipping");
        metrics.inc_unknown();
        return Ok(!params.keep_unknown_on_queue);
    }

    // Attempt every action; remember the first failure. One action failing
    // must not starve the others, but any failure rolls the message back.
    let mut first_failure: Option<ContractError> = None;
    for action in actions {
        if let Err(e) = run_action(action, &source_keys, queue, metrics, stop).await {
            metrics.inc_failures();
            warn!(
                action = %action.name,
                bucket = %block.bucket,
                error = %e,
                "action failed"
            );
            first_failure.get_or_insert(e);
        }
    }

    match first_failure {
        Some(e) => Err(e.into()),
        None => Ok(true),
    }
}

async fn run_action(
    action: &Action,
    source_keys: &[String],
    queue: &dyn WorkQueue,
    metrics: &EngineMetrics,
    stop: &CancellationToken,
) -> Result<(), ContractError> {
    // Canonical source key: the lexicographic minimum of the sequence
    let source_key = source_keys
        .iter()
        .min()
        .cloned()
        .unwrap_or_default();

    let mut source: Box<dyn SourceReader> = if source_keys.len() > 1 {
        let mut readers = Vec::with_capacity(source_keys.len());
        for key in source_keys {
            readers.push(action.source.get_key(key).await?);
        }
        Box::new(ConcatSource::new(readers))
    } else {
        action.source.get_key(&source_key).await?
    };

    info!(
        action = %action.name,
        source = %action.source_bucket,
        key = %source_key,
        "execute action"
    );

    let new_keys = action
        .transformer
        .transform(&source_key, source.as_mut(), &action.destination, stop)
        .await
        .map_err(|e| {
            ContractError::transform(
                &action.name,
                &source_key,
                action.destination.name(),
                e.to_string(),
            )
        })?;

    let reconciliation = reconcile::reconcile(action, &source_key, new_keys).await?;

    if reconciliation.is_anomalous() {
        // Alert and move on: the message still counts as processed.
        metrics.inc_anomalies();
        if reconciliation.old_keys.is_empty() {
            warn!(
                action = %action.name,
                key = %source_key,
                "expected new keys after processing"
            );
        } else {
            warn!(
                action = %action.name,
                key = %source_key,
                old_keys = ?reconciliation.old_keys,
                "expected new keys after processing, especially since there were old ones"
            );
        }
        return Ok(());
    }

    let stale = reconciliation.stale_keys();
    metrics.add_stale_keys(stale.len());
    let deleted = reconcile::apply_stale_policy(action, &reconciliation).await?;
    metrics.add_deleted_keys(deleted);

    // Fan-out: produced keys become new source blocks so downstream actions
    // can chain. Index destinations are terminal.
    if action.destination.is_blob() {
        if let Some(destination_bucket) = &action.destination_bucket {
            for key in reconciliation.fanout_keys() {
                queue
                    .add(SourceBlock::new(destination_bucket.clone(), key))
                    .await?;
                metrics.inc_fanout();
            }
        }
    }

    Ok(())
}
