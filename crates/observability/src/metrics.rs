//! Engine metric recording
//!
//! Thin helpers over the `metrics` macros so the exporter sees consistent
//! metric names and labels regardless of which component reports.

use metrics::gauge;

/// Record current queue backlog
pub fn record_queue_backlog(queue: &str, backlog: usize) {
    gauge!("etl_queue_backlog", "queue" => queue.to_string()).set(backlog as f64);
}

/// Engine progress counters, exported as absolute gauges.
///
/// The engine keeps its own atomic counters; this publishes a snapshot of
/// them, so it is called periodically (and once at shutdown) rather than per
/// event.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineProgress {
    pub processed: u64,
    pub committed: u64,
    pub rolled_back: u64,
    pub unknown: u64,
    pub anomalies: u64,
    pub stale_keys: u64,
    pub deleted_keys: u64,
    pub fanout: u64,
    pub failures: u64,
}

/// Record engine progress
pub fn record_engine_progress(progress: &EngineProgress) {
    gauge!("etl_messages_processed").set(progress.processed as f64);
    gauge!("etl_messages_committed").set(progress.committed as f64);
    gauge!("etl_messages_rolled_back").set(progress.rolled_back as f64);
    gauge!("etl_messages_unmatched").set(progress.unknown as f64);
    gauge!("etl_anomaly_alerts").set(progress.anomalies as f64);
    gauge!("etl_stale_keys_observed").set(progress.stale_keys as f64);
    gauge!("etl_stale_keys_deleted").set(progress.deleted_keys as f64);
    gauge!("etl_fanout_blocks").set(progress.fanout as f64);
    gauge!("etl_action_failures").set(progress.failures as f64);
}
