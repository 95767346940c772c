//! The store gateway: the only way the engine talks to a document store.
//!
//! A gateway addresses documents by collection name and key. Each document
//! carries a JSON object of fields. Writes are full replacements; there is no
//! partial merge, no batching and no transactions.

use crate::{error::Result, DocumentKey};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A document as returned by [`StoreGateway::list_all`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Key of the document within its collection
    pub key: DocumentKey,
    /// Document fields (a JSON object)
    pub fields: serde_json::Value,
}

impl Document {
    /// Create a document.
    pub fn new(key: impl Into<DocumentKey>, fields: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            fields,
        }
    }
}

/// Access to a remote document collection.
///
/// Implementations report transport or backend failures as
/// [`Error::StoreUnavailable`](crate::Error::StoreUnavailable) and refused
/// writes as [`Error::StoreWriteRejected`](crate::Error::StoreWriteRejected).
/// Nothing is retried.
#[async_trait]
pub trait StoreGateway: Send + Sync {
    /// Read every document in a collection.
    async fn list_all(&self, collection: &str) -> Result<Vec<Document>>;

    /// Read one document's fields. An absent key is `Ok(None)`, not an error.
    async fn get_by_key(&self, collection: &str, key: &str) -> Result<Option<serde_json::Value>>;

    /// Create the document or replace it entirely.
    async fn upsert(&self, collection: &str, key: &str, fields: serde_json::Value) -> Result<()>;

    /// Remove a document. Removing an absent key succeeds.
    async fn delete_by_key(&self, collection: &str, key: &str) -> Result<()>;
}

/// Shared handle to a gateway.
pub type SharedGateway = Arc<dyn StoreGateway>;
