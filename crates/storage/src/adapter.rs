use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::document::Document;
use crate::error::Result;

/// Aggregate figures for a storage backend.
#[derive(Debug, Clone, Default)]
pub struct StorageStats {
    pub document_count: u64,
    pub last_indexed: Option<DateTime<Utc>>,
}

/// The storage contract shared by the in-memory and on-disk backends.
///
/// All operations are safe under concurrent readers; writers take an
/// exclusive lock over the backing map or index. `clear` is exclusive with
/// everything else.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Upserts a document keyed on `doc.url`.
    async fn store(&self, doc: Document) -> Result<()>;

    /// Stores a sequence of documents as one indexing batch.
    ///
    /// Equivalent to a sequence of `store` calls; backends chunk commits at
    /// no more than 1000 documents.
    async fn batch_store(&self, docs: Vec<Document>) -> Result<()>;

    /// Returns the document stored under `url`, or `DocumentNotFound`.
    async fn get(&self, url: &str) -> Result<Document>;

    /// Returns every stored document, up to the backend's ceiling.
    async fn get_all(&self) -> Result<Vec<Document>>;

    /// Alias of `get_all`.
    async fn list(&self) -> Result<Vec<Document>> {
        self.get_all().await
    }

    /// Removes the document stored under `url`.
    async fn delete(&self, url: &str) -> Result<()>;

    /// Removes every document and recreates an empty index.
    async fn clear(&self) -> Result<()>;

    async fn stats(&self) -> Result<StorageStats>;

    /// Releases backend resources. Further calls after `close` are invalid.
    async fn close(&self) -> Result<()>;
}
