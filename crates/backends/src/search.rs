//! MemoryCluster - in-process search cluster
//!
//! Named indices with alias sets, per-index refresh interval, bulk writes
//! and alias-wide ancestry search. The lineage query is evaluated directly
//! against each document's `etl` chain; a production cluster adapter would
//! compile the same query to term filters.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use contracts::{
    ContractError, Document, IndexHandle, IndexSettings, LineageQuery, SearchCluster,
};

/// One in-memory index.
pub struct MemoryIndex {
    name: String,
    settings: IndexSettings,
    docs: RwLock<BTreeMap<String, Document>>,
    aliases: RwLock<HashSet<String>>,
    refresh_interval: RwLock<Option<Duration>>,
}

impl MemoryIndex {
    fn new(name: &str, settings: &IndexSettings) -> Self {
        Self {
            name: name.to_string(),
            settings: settings.clone(),
            docs: RwLock::new(BTreeMap::new()),
            aliases: RwLock::new(HashSet::new()),
            refresh_interval: RwLock::new(None),
        }
    }

    pub fn doc_count(&self) -> usize {
        self.docs.read().unwrap().len()
    }

    pub fn doc_ids(&self) -> BTreeSet<String> {
        self.docs.read().unwrap().keys().cloned().collect()
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.aliases.read().unwrap().contains(alias)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        *self.refresh_interval.read().unwrap()
    }

    pub fn settings(&self) -> &IndexSettings {
        &self.settings
    }
}

#[async_trait]
impl IndexHandle for MemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add_alias(&self, alias: &str) -> Result<(), ContractError> {
        self.aliases.write().unwrap().insert(alias.to_string());
        Ok(())
    }

    async fn set_refresh_interval(&self, interval: Duration) -> Result<(), ContractError> {
        *self.refresh_interval.write().unwrap() = Some(interval);
        Ok(())
    }

    async fn bulk(&self, documents: Vec<Document>) -> Result<(), ContractError> {
        let mut docs = self.docs.write().unwrap();
        for doc in documents {
            docs.insert(doc.id.clone(), doc);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), ContractError> {
        self.docs.write().unwrap().remove(id);
        Ok(())
    }
}

/// Cluster of named indices; `get_or_create_index` is idempotent.
#[derive(Default)]
pub struct MemoryCluster {
    indices: Mutex<HashMap<String, Arc<MemoryIndex>>>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct access to an index, for assertions.
    pub fn index(&self, name: &str) -> Option<Arc<MemoryIndex>> {
        self.indices.lock().unwrap().get(name).cloned()
    }

    /// Physical index names, sorted.
    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.indices.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl SearchCluster for MemoryCluster {
    async fn get_or_create_index(
        &self,
        name: &str,
        settings: &IndexSettings,
    ) -> Result<Arc<dyn IndexHandle>, ContractError> {
        let mut indices = self.indices.lock().unwrap();
        let index = indices
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(index = name, "created index");
                Arc::new(MemoryIndex::new(name, settings))
            })
            .clone();
        Ok(index)
    }

    async fn search_ids(
        &self,
        alias: &str,
        query: &LineageQuery,
    ) -> Result<BTreeSet<String>, ContractError> {
        let indices: Vec<Arc<MemoryIndex>> = {
            let guard = self.indices.lock().unwrap();
            guard
                .values()
                .filter(|i| i.has_alias(alias))
                .cloned()
                .collect()
        };

        let mut hits = BTreeSet::new();
        for index in indices {
            let docs = index.docs.read().unwrap();
            hits.extend(
                docs.values()
                    .filter(|d| query.matches(&d.etl))
                    .map(|d| d.id.clone()),
            );
        }
        Ok(hits)
    }

    async fn delete_id(&self, alias: &str, id: &str) -> Result<(), ContractError> {
        let indices: Vec<Arc<MemoryIndex>> = {
            let guard = self.indices.lock().unwrap();
            guard
                .values()
                .filter(|i| i.has_alias(alias))
                .cloned()
                .collect()
        };
        for index in indices {
            index.docs.write().unwrap().remove(id);
        }
        Ok(())
    }
}
