//! Destination sink interfaces
//!
//! A destination is either an object bucket (blob artifacts, enumerable by
//! raw prefix) or an index sink (documents, enumerable by lineage query).
//! Both expose `keys(prefix)` so reconciliation stays sink-agnostic.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{Bucket, ContractError, Document};

/// Batched document destination backed by a search index.
#[async_trait]
pub trait IndexSink: Send + Sync {
    /// Sink name (used for logging/metrics and error identity)
    fn name(&self) -> &str;

    /// Queue one document for indexing; may block on queue capacity.
    async fn add(&self, document: Document) -> Result<(), ContractError>;

    /// Queue a batch of documents for indexing.
    async fn extend(&self, documents: Vec<Document>) -> Result<(), ContractError>;

    /// Keys previously produced for artifacts derived from `prefix`.
    async fn keys(&self, prefix: &str) -> Result<BTreeSet<String>, ContractError>;

    /// Delete one document by produced key (stale-deletion policy hook).
    async fn delete(&self, key: &str) -> Result<(), ContractError>;
}

/// Polymorphic destination handle held by actions.
///
/// Sinks are owned by the sink registry; actions hold shared references, so
/// equivalent configurations resolve to the identical handle.
#[derive(Clone)]
pub enum Destination {
    /// Object-store bucket destination
    Blob(Arc<dyn Bucket>),
    /// Search-index destination
    Index(Arc<dyn IndexSink>),
}

impl Destination {
    /// Destination identity for logs and transform errors.
    pub fn name(&self) -> &str {
        match self {
            Self::Blob(bucket) => bucket.name(),
            Self::Index(sink) => sink.name(),
        }
    }

    /// Blob destinations fan produced keys back onto the work queue.
    pub fn is_blob(&self) -> bool {
        matches!(self, Self::Blob(_))
    }

    /// Keys previously produced for artifacts derived from `prefix`.
    pub async fn keys(&self, prefix: &str) -> Result<BTreeSet<String>, ContractError> {
        match self {
            Self::Blob(bucket) => bucket.keys(prefix).await,
            Self::Index(sink) => sink.keys(prefix).await,
        }
    }

    /// Delete one produced artifact (stale-deletion policy hook).
    pub async fn delete(&self, key: &str) -> Result<(), ContractError> {
        match self {
            Self::Blob(bucket) => bucket.delete_key(key).await,
            Self::Index(sink) => sink.delete(key).await,
        }
    }
}

impl std::fmt::Debug for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blob(bucket) => write!(f, "Destination::Blob({})", bucket.name()),
            Self::Index(sink) => write!(f, "Destination::Index({})", sink.name()),
        }
    }
}
