//! json_to_index - load JSON lines into an index destination
//!
//! Each line becomes one document carrying a per-line derived lineage. A
//! leading header line of the form `{"etl": ...}` (as written by
//! `line_split`) is consumed as the provenance envelope rather than indexed.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use contracts::{
    ContractError, Destination, Document, IndexSink, Lineage, SourceReader, Transformer,
};

#[derive(Default)]
pub struct JsonToIndexTransform;

impl JsonToIndexTransform {
    pub fn new() -> Self {
        Self
    }

    fn is_lineage_header(value: &Value) -> bool {
        value
            .as_object()
            .is_some_and(|o| o.len() == 1 && o.contains_key("etl"))
    }
}

#[async_trait]
impl Transformer for JsonToIndexTransform {
    fn name(&self) -> &str {
        "json_to_index"
    }

    async fn transform(
        &self,
        source_key: &str,
        source: &mut dyn SourceReader,
        destination: &Destination,
        _stop: &CancellationToken,
    ) -> Result<BTreeSet<String>, ContractError> {
        let Destination::Index(sink) = destination else {
            return Err(ContractError::sink_write(
                destination.name(),
                "json_to_index requires an index destination",
            ));
        };

        let content = source.read().await?;
        let base = Lineage::parse(source_key);

        let mut documents = Vec::new();
        let mut produced = BTreeSet::new();
        let mut ordinal = 0usize;
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(line).map_err(|e| {
                ContractError::Other(format!("line {line_no}: not JSON: {e}"))
            })?;
            if line_no == 0 && Self::is_lineage_header(&value) {
                continue;
            }

            let lineage =
                base.derive(ordinal.to_string(), Some("json to index"), None);
            ordinal += 1;

            let document = Document::new(lineage, value);
            produced.insert(document.id.clone());
            documents.push(document);
        }

        debug!(key = source_key, documents = documents.len(), "indexing source");
        sink.extend(documents).await?;
        Ok(produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backends::MemoryCluster;
    use contracts::{IndexSinkConfig, SearchCluster};
    use std::sync::Arc;

    use crate::sinks::DatePartitionedSink;

    struct FixedReader(String);

    #[async_trait]
    impl SourceReader for FixedReader {
        async fn read(&mut self) -> Result<String, ContractError> {
            Ok(self.0.clone())
        }
    }

    fn daily_destination(cluster: &Arc<MemoryCluster>) -> Destination {
        Destination::Index(Arc::new(DatePartitionedSink::new(
            IndexSinkConfig::named("unittest"),
            Arc::clone(cluster) as Arc<dyn SearchCluster>,
        )))
    }

    #[tokio::test]
    async fn test_indexes_one_document_per_line() {
        let cluster = Arc::new(MemoryCluster::new());
        let destination = daily_destination(&cluster);

        let mut source = FixedReader(
            [
                r#"{"etl": {"id": "0", "source": {"id": "140847"}}}"#,
                r#"{"result": "pass", "build": {"date": 1577836800}}"#,
                r#"{"result": "fail", "build": {"date": 1577836900}}"#,
            ]
            .join("\n"),
        );

        let produced = JsonToIndexTransform::new()
            .transform(
                "140847.5.0",
                &mut source,
                &destination,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(
            produced.iter().cloned().collect::<Vec<_>>(),
            vec!["140847.5.0.0", "140847.5.0.1"]
        );

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let index = cluster.index("unittest_2020-01-01").unwrap();
        assert_eq!(index.doc_count(), 2);
    }

    #[tokio::test]
    async fn test_bad_json_fails_transform() {
        let cluster = Arc::new(MemoryCluster::new());
        let destination = daily_destination(&cluster);

        let mut source = FixedReader("not json at all".to_string());
        let err = JsonToIndexTransform::new()
            .transform("a.1", &mut source, &destination, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not JSON"));
    }

    #[tokio::test]
    async fn test_missing_timestamp_propagates_routing_error() {
        let cluster = Arc::new(MemoryCluster::new());
        let destination = daily_destination(&cluster);

        let mut source = FixedReader(r#"{"result": "pass"}"#.to_string());
        let err = JsonToIndexTransform::new()
            .transform("a.1", &mut source, &destination, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::Routing { .. }));
    }
}
