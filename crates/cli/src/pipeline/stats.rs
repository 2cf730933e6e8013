//! Engine run statistics.

use std::time::Duration;

use dispatcher::EngineMetricsSnapshot;

/// Final statistics for one engine run.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Engine counters at shutdown
    pub snapshot: EngineMetricsSnapshot,
    /// Wall-clock run time
    pub duration: Duration,
}

impl PipelineStats {
    pub fn new(snapshot: EngineMetricsSnapshot, duration: Duration) -> Self {
        Self { snapshot, duration }
    }

    /// Messages per second over the whole run.
    pub fn rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.snapshot.processed as f64 / secs
        } else {
            0.0
        }
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n{}", self.snapshot);
        println!(
            "Duration: {:.2}s ({:.2} messages/second)",
            self.duration.as_secs_f64(),
            self.rate()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate() {
        let snapshot = EngineMetricsSnapshot {
            processed: 100,
            ..Default::default()
        };
        let stats = PipelineStats::new(snapshot, Duration::from_secs(10));
        assert!((stats.rate() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_duration_rate() {
        let stats = PipelineStats::new(Default::default(), Duration::ZERO);
        assert_eq!(stats.rate(), 0.0);
    }
}
