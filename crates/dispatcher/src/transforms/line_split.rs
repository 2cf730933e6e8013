//! line_split - split a text blob into fixed-size line chunks
//!
//! Each chunk lands in the destination bucket under a derived key
//! (`{source_key}.{ordinal}`), prefixed with a one-line lineage header so
//! downstream stages can recover provenance without re-deriving it from the
//! key.

use std::collections::BTreeSet;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use contracts::{
    Bucket, ContractError, Destination, Lineage, SourceReader, Transformer,
};

pub struct LineSplitTransform {
    /// Lines per produced chunk
    chunk_lines: usize,
}

impl LineSplitTransform {
    pub fn new(chunk_lines: usize) -> Self {
        Self {
            chunk_lines: chunk_lines.max(1),
        }
    }
}

impl Default for LineSplitTransform {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl Transformer for LineSplitTransform {
    fn name(&self) -> &str {
        "line_split"
    }

    async fn transform(
        &self,
        source_key: &str,
        source: &mut dyn SourceReader,
        destination: &Destination,
        _stop: &CancellationToken,
    ) -> Result<BTreeSet<String>, ContractError> {
        let Destination::Blob(bucket) = destination else {
            return Err(ContractError::sink_write(
                destination.name(),
                "line_split requires a bucket destination",
            ));
        };

        let content = source.read().await?;
        let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
        let base = Lineage::parse(source_key);

        let mut produced = BTreeSet::new();
        for (ordinal, chunk) in lines.chunks(self.chunk_lines).enumerate() {
            let lineage = base.derive(ordinal.to_string(), Some("line split"), Some("join"));
            let key = lineage.key();

            let header = serde_json::to_string(&serde_json::json!({ "etl": lineage }))
                .map_err(|e| ContractError::sink_write(bucket.name(), e.to_string()))?;
            let payload = format!("{header}\n{}\n", chunk.join("\n"));

            bucket.write(&key, Bytes::from(payload)).await?;
            produced.insert(key);
        }

        debug!(
            key = source_key,
            lines = lines.len(),
            chunks = produced.len(),
            "split source"
        );
        Ok(produced)
    }
}
