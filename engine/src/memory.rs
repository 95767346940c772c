//! In-memory store gateway.
//!
//! Holds documents in process memory. Used by tests and for running the
//! server without a database. Documents list in key order.

use crate::{error::Result, CollectionName, Document, DocumentKey, Error, StoreGateway};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Documents of one collection, keyed by document key.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    documents: BTreeMap<DocumentKey, Value>,
}

impl Collection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self {
            documents: BTreeMap::new(),
        }
    }

    /// Get a document's fields by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.documents.get(key)
    }

    /// Insert or replace a document.
    pub fn insert(&mut self, key: impl Into<DocumentKey>, fields: Value) {
        self.documents.insert(key.into(), fields);
    }

    /// Remove a document, returning its fields if it existed.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.documents.remove(key)
    }

    /// All documents in key order.
    pub fn documents(&self) -> impl Iterator<Item = Document> + '_ {
        self.documents
            .iter()
            .map(|(key, fields)| Document::new(key.clone(), fields.clone()))
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if the collection has no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// A [`StoreGateway`] backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    collections: RwLock<BTreeMap<CollectionName, Collection>>,
}

impl MemoryGateway {
    /// Create an empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gateway pre-populated with documents in one collection.
    pub fn with_documents(
        collection: impl Into<CollectionName>,
        documents: impl IntoIterator<Item = (DocumentKey, Value)>,
    ) -> Self {
        let mut contents = Collection::new();
        for (key, fields) in documents {
            contents.insert(key, fields);
        }

        let mut collections = BTreeMap::new();
        collections.insert(collection.into(), contents);
        Self {
            collections: RwLock::new(collections),
        }
    }

    /// Copy of a collection's current contents, for inspection.
    pub fn collection(&self, name: &str) -> Option<Collection> {
        self.collections.read().ok()?.get(name).cloned()
    }

    /// Number of documents in a collection (zero if it does not exist).
    pub fn document_count(&self, name: &str) -> usize {
        self.collection(name).map(|c| c.len()).unwrap_or(0)
    }
}

fn poisoned() -> Error {
    Error::StoreUnavailable("memory store lock poisoned".to_string())
}

#[async_trait]
impl StoreGateway for MemoryGateway {
    async fn list_all(&self, collection: &str) -> Result<Vec<Document>> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        Ok(collections
            .get(collection)
            .map(|c| c.documents().collect())
            .unwrap_or_default())
    }

    async fn get_by_key(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        Ok(collections
            .get(collection)
            .and_then(|c| c.get(key))
            .cloned())
    }

    async fn upsert(&self, collection: &str, key: &str, fields: Value) -> Result<()> {
        if !fields.is_object() {
            return Err(Error::StoreWriteRejected {
                collection: collection.to_string(),
                key: key.to_string(),
                reason: "fields must be an object".to_string(),
            });
        }

        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(key, fields);
        Ok(())
    }

    async fn delete_by_key(&self, collection: &str, key: &str) -> Result<()> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        if let Some(contents) = collections.get_mut(collection) {
            contents.remove(key);
        }
        Ok(())
    }
}
