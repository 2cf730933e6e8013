//! ConcatSource - make many sources look like one
//!
//! Presents several physical source keys as one logical readable source for
//! the rare case a notification references a merged key range. Reads are
//! concatenated in key order, joined by a newline (sources are line-oriented).

use async_trait::async_trait;

use contracts::{ContractError, SourceReader};

pub struct ConcatSource {
    sources: Vec<Box<dyn SourceReader>>,
}

impl ConcatSource {
    pub fn new(sources: Vec<Box<dyn SourceReader>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl SourceReader for ConcatSource {
    async fn read(&mut self) -> Result<String, ContractError> {
        let mut parts = Vec::with_capacity(self.sources.len());
        for source in &mut self.sources {
            parts.push(source.read().await?);
        }
        Ok(parts.join("\n"))
    }
}
