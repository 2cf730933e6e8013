//! MemoryBucket - in-process object store bucket

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use contracts::{Bucket, BucketProvider, BucketSinkConfig, ContractError, SourceReader};

/// Ordered key → bytes map behind the [`Bucket`] trait; raw prefix scans
/// like an object store listing.
pub struct MemoryBucket {
    name: String,
    objects: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryBucket {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().unwrap().is_empty()
    }

    /// Full object content, for assertions.
    pub fn get_bytes(&self, key: &str) -> Option<Bytes> {
        self.objects.read().unwrap().get(key).cloned()
    }
}

struct MemoryReader {
    content: String,
}

#[async_trait]
impl SourceReader for MemoryReader {
    async fn read(&mut self) -> Result<String, ContractError> {
        Ok(self.content.clone())
    }
}

#[async_trait]
impl Bucket for MemoryBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_key(&self, key: &str) -> Result<Box<dyn SourceReader>, ContractError> {
        let bytes = self
            .objects
            .read()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| ContractError::bucket_read(&self.name, key, "no such key"))?;
        let content = String::from_utf8(bytes.to_vec())
            .map_err(|e| ContractError::bucket_read(&self.name, key, e.to_string()))?;
        Ok(Box::new(MemoryReader { content }))
    }

    async fn keys(&self, prefix: &str) -> Result<BTreeSet<String>, ContractError> {
        let objects = self.objects.read().unwrap();
        Ok(objects
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn write(&self, key: &str, bytes: Bytes) -> Result<(), ContractError> {
        self.objects.write().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn delete_key(&self, key: &str) -> Result<(), ContractError> {
        self.objects.write().unwrap().remove(key);
        Ok(())
    }
}

/// Name-keyed set of memory buckets.
///
/// Both the bucket-provider seam for the sink registry and the way tests and
/// the CLI's local mode reach the same bucket the engine writes to.
#[derive(Default)]
pub struct MemoryStores {
    buckets: Mutex<HashMap<String, Arc<MemoryBucket>>>,
}

impl MemoryStores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the bucket with this name.
    pub fn bucket(&self, name: &str) -> Arc<MemoryBucket> {
        self.buckets
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryBucket::new(name)))
            .clone()
    }
}

#[async_trait]
impl BucketProvider for MemoryStores {
    async fn open_bucket(
        &self,
        config: &BucketSinkConfig,
    ) -> Result<Arc<dyn Bucket>, ContractError> {
        Ok(self.bucket(&config.bucket))
    }
}
