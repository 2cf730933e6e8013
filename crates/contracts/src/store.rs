//! External store interfaces: object buckets and the search cluster
//!
//! These traits are the boundary to the blob store and search cluster
//! clients. The workspace ships in-memory implementations in `backends`;
//! production clients implement the same traits.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{BucketSinkConfig, ContractError, Document, LineageQuery};

/// Readable source handed to transformers.
///
/// Source objects are line-oriented text blobs read whole, matching the way
/// transforms consume them.
#[async_trait]
pub trait SourceReader: Send {
    /// Read the full content.
    async fn read(&mut self) -> Result<String, ContractError>;
}

/// An object-store bucket: source container and blob destination in one.
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Bucket name
    fn name(&self) -> &str;

    /// Open a reader over one object.
    ///
    /// # Errors
    /// `BucketRead` when the key does not exist.
    async fn get_key(&self, key: &str) -> Result<Box<dyn SourceReader>, ContractError>;

    /// Enumerate keys under a raw prefix.
    async fn keys(&self, prefix: &str) -> Result<std::collections::BTreeSet<String>, ContractError>;

    /// Write one object, overwriting any previous content.
    async fn write(&self, key: &str, bytes: Bytes) -> Result<(), ContractError>;

    /// Delete one object; deleting a missing key is not an error.
    async fn delete_key(&self, key: &str) -> Result<(), ContractError>;
}

/// Opens bucket clients from configuration.
///
/// The sink registry calls this once per distinct normalized config; the
/// provider does not need to cache.
#[async_trait]
pub trait BucketProvider: Send + Sync {
    async fn open_bucket(
        &self,
        config: &BucketSinkConfig,
    ) -> Result<Arc<dyn Bucket>, ContractError>;
}

/// Per-index settings applied at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSettings {
    pub shards: u32,
    pub replicas: u32,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            shards: 1,
            replicas: 1,
        }
    }
}

/// A search cluster: index lifecycle plus alias-wide ancestry search.
#[async_trait]
pub trait SearchCluster: Send + Sync {
    /// Fetch an index by name, creating it when absent.
    async fn get_or_create_index(
        &self,
        name: &str,
        settings: &IndexSettings,
    ) -> Result<Arc<dyn IndexHandle>, ContractError>;

    /// Ids of documents matching `query` across every index under `alias`.
    async fn search_ids(
        &self,
        alias: &str,
        query: &LineageQuery,
    ) -> Result<std::collections::BTreeSet<String>, ContractError>;

    /// Delete one document by id from whichever index under `alias` holds
    /// it; a missing id is not an error.
    async fn delete_id(&self, alias: &str, id: &str) -> Result<(), ContractError>;
}

/// One live index inside the cluster.
#[async_trait]
pub trait IndexHandle: Send + Sync {
    /// Physical index name
    fn name(&self) -> &str;

    /// Register this index under a shared alias.
    async fn add_alias(&self, alias: &str) -> Result<(), ContractError>;

    /// Set the index refresh interval (coarse intervals reduce indexing cost).
    async fn set_refresh_interval(&self, interval: Duration) -> Result<(), ContractError>;

    /// Write a batch of documents; later writes with the same id overwrite.
    async fn bulk(&self, documents: Vec<Document>) -> Result<(), ContractError>;

    /// Delete one document by id; deleting a missing id is not an error.
    async fn delete(&self, id: &str) -> Result<(), ContractError>;
}
