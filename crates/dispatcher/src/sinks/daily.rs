//! DatePartitionedSink - one logical index sharded across calendar days
//!
//! Documents route to a per-day underlying index named `{alias}_{date}`,
//! created lazily on first write for that day, registered under the shared
//! alias, given a coarse refresh interval, and fronted by its own batched
//! write queue. Day slices live for the rest of the process.
//!
//! `keys(prefix)` never scans a single day index: physical keys are
//! partitioned by day but lineage is day-independent, so it queries the
//! shared alias by ancestry.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use contracts::{
    ContractError, Document, IndexSettings, IndexSink, IndexSinkConfig, LineageQuery,
    SearchCluster,
};

use crate::sinks::writer::BatchedWriter;

struct DaySlice {
    writer: BatchedWriter,
}

pub struct DatePartitionedSink {
    config: IndexSinkConfig,
    cluster: Arc<dyn SearchCluster>,
    /// Day start (epoch seconds) → slice. Get-or-create must be atomic:
    /// concurrent dispatch workers may route to the same day.
    slices: Mutex<HashMap<i64, Arc<DaySlice>>>,
}

impl DatePartitionedSink {
    pub fn new(config: IndexSinkConfig, cluster: Arc<dyn SearchCluster>) -> Self {
        Self {
            config,
            cluster,
            slices: Mutex::new(HashMap::new()),
        }
    }

    /// Floor an epoch-seconds timestamp to its UTC day.
    fn day_floor(&self, id: &str, timestamp: f64) -> Result<DateTime<Utc>, ContractError> {
        let dt = DateTime::<Utc>::from_timestamp(timestamp.floor() as i64, 0)
            .ok_or_else(|| {
                ContractError::routing(id, format!("timestamp {timestamp} out of range"))
            })?;
        Ok(dt
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc())
    }

    async fn slice_for(&self, day: DateTime<Utc>) -> Result<Arc<DaySlice>, ContractError> {
        let mut slices = self.slices.lock().await;
        if let Some(slice) = slices.get(&day.timestamp()) {
            return Ok(Arc::clone(slice));
        }

        let index_name = format!("{}_{}", self.config.index, day.format("%Y-%m-%d"));
        debug!(index = %index_name, alias = %self.config.index, "creating day slice");

        let index = self
            .cluster
            .get_or_create_index(&index_name, &IndexSettings::default())
            .await?;
        index.add_alias(&self.config.index).await?;
        index
            .set_refresh_interval(Duration::from_secs(self.config.refresh_interval_secs))
            .await?;

        let slice = Arc::new(DaySlice {
            writer: BatchedWriter::spawn(
                index,
                self.config.max_queue_size,
                self.config.batch_size,
            ),
        });
        slices.insert(day.timestamp(), Arc::clone(&slice));
        Ok(slice)
    }

    async fn route(&self, document: Document) -> Result<(), ContractError> {
        let timestamp = document.event_timestamp(&self.config.timestamp_fields)?;
        let day = self.day_floor(&document.id, timestamp)?;
        let slice = self.slice_for(day).await?;
        // Send outside the slice map lock: backpressure on one day's queue
        // must not block routing to other days.
        slice.writer.send(document).await
    }

    /// Days with live slices, for introspection.
    pub async fn slice_count(&self) -> usize {
        self.slices.lock().await.len()
    }
}

#[async_trait]
impl IndexSink for DatePartitionedSink {
    fn name(&self) -> &str {
        &self.config.index
    }

    async fn add(&self, document: Document) -> Result<(), ContractError> {
        self.route(document).await
    }

    async fn extend(&self, documents: Vec<Document>) -> Result<(), ContractError> {
        for document in documents {
            self.route(document).await?;
        }
        Ok(())
    }

    #[instrument(name = "daily_sink_keys", skip(self), fields(alias = %self.config.index))]
    async fn keys(&self, prefix: &str) -> Result<BTreeSet<String>, ContractError> {
        self.cluster
            .search_ids(&self.config.index, &LineageQuery::for_key(prefix))
            .await
    }

    async fn delete(&self, key: &str) -> Result<(), ContractError> {
        self.cluster.delete_id(&self.config.index, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backends::MemoryCluster;
    use contracts::Lineage;
    use serde_json::json;

    const DAY1: i64 = 1_577_836_800; // 2020-01-01T00:00:00Z
    const DAY2: i64 = 1_577_923_200; // 2020-01-02T00:00:00Z

    fn sink(cluster: &Arc<MemoryCluster>) -> DatePartitionedSink {
        DatePartitionedSink::new(
            IndexSinkConfig::named("unittest"),
            Arc::clone(cluster) as Arc<dyn SearchCluster>,
        )
    }

    fn doc(key: &str, build_date: i64) -> Document {
        Document::new(Lineage::parse(key), json!({"build": {"date": build_date}}))
    }

    /// Writers flush asynchronously
    async fn flush_wait() {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_same_day_routes_to_same_slice() {
        let cluster = Arc::new(MemoryCluster::new());
        let sink = sink(&cluster);

        sink.add(doc("140847.5.0", DAY1)).await.unwrap();
        sink.add(doc("140847.5.1", DAY1 + 3600)).await.unwrap();
        flush_wait().await;

        assert_eq!(sink.slice_count().await, 1);
        assert_eq!(cluster.index_names(), vec!["unittest_2020-01-01"]);
        assert_eq!(cluster.index("unittest_2020-01-01").unwrap().doc_count(), 2);
    }

    #[tokio::test]
    async fn test_different_days_share_one_alias() {
        let cluster = Arc::new(MemoryCluster::new());
        let sink = sink(&cluster);

        sink.extend(vec![doc("140847.5.0", DAY1), doc("140847.5.1", DAY2)])
            .await
            .unwrap();
        flush_wait().await;

        assert_eq!(
            cluster.index_names(),
            vec!["unittest_2020-01-01", "unittest_2020-01-02"]
        );
        for name in cluster.index_names() {
            let index = cluster.index(&name).unwrap();
            assert!(index.has_alias("unittest"));
            assert_eq!(
                index.refresh_interval(),
                Some(Duration::from_secs(3600))
            );
        }
    }

    #[tokio::test]
    async fn test_keys_queries_alias_across_days() {
        let cluster = Arc::new(MemoryCluster::new());
        let sink = sink(&cluster);

        sink.extend(vec![
            doc("140847.5.0", DAY1),
            doc("140847.5.1", DAY2),
            doc("140848.0.0", DAY1),
        ])
        .await
        .unwrap();
        flush_wait().await;

        let keys = sink.keys("140847.5").await.unwrap();
        assert_eq!(
            keys.into_iter().collect::<Vec<_>>(),
            vec!["140847.5.0", "140847.5.1"]
        );
    }

    #[tokio::test]
    async fn test_missing_timestamp_is_routing_error() {
        let cluster = Arc::new(MemoryCluster::new());
        let sink = sink(&cluster);

        let document = Document::new(Lineage::parse("a.1"), json!({"no": "timestamp"}));
        let err = sink.add(document).await.unwrap_err();
        assert!(matches!(err, ContractError::Routing { .. }));
        assert_eq!(sink.slice_count().await, 0);
    }

    #[tokio::test]
    async fn test_delete_reaches_day_indices() {
        let cluster = Arc::new(MemoryCluster::new());
        let sink = sink(&cluster);

        sink.add(doc("140847.5.0", DAY1)).await.unwrap();
        flush_wait().await;

        sink.delete("140847.5.0").await.unwrap();
        assert_eq!(cluster.index("unittest_2020-01-01").unwrap().doc_count(), 0);
    }
}
