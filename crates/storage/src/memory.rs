use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::adapter::{StorageAdapter, StorageStats};
use crate::document::Document;
use crate::error::{Result, StorageError};

/// Process-lifetime storage backed by a map. The default for tests.
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

struct Inner {
    docs: HashMap<String, Document>,
    // Insertion order, so get_all is deterministic for ranking tie-breaks.
    order: Vec<String>,
    last_indexed: Option<DateTime<Utc>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                docs: HashMap::new(),
                order: Vec::new(),
                last_indexed: None,
            }),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn store(&self, doc: Document) -> Result<()> {
        doc.validate()?;
        let mut inner = self.inner.write().await;
        if !inner.docs.contains_key(&doc.url) {
            inner.order.push(doc.url.clone());
        }
        inner.docs.insert(doc.url.clone(), doc);
        inner.last_indexed = Some(Utc::now());
        Ok(())
    }

    async fn batch_store(&self, docs: Vec<Document>) -> Result<()> {
        for doc in &docs {
            doc.validate()?;
        }
        let mut inner = self.inner.write().await;
        for doc in docs {
            if !inner.docs.contains_key(&doc.url) {
                inner.order.push(doc.url.clone());
            }
            inner.docs.insert(doc.url.clone(), doc);
        }
        inner.last_indexed = Some(Utc::now());
        Ok(())
    }

    async fn get(&self, url: &str) -> Result<Document> {
        let inner = self.inner.read().await;
        inner
            .docs
            .get(url)
            .cloned()
            .ok_or_else(|| StorageError::DocumentNotFound(url.to_string()))
    }

    async fn get_all(&self) -> Result<Vec<Document>> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|url| inner.docs.get(url).cloned())
            .collect())
    }

    async fn delete(&self, url: &str) -> Result<()> {
        // Deleting a missing document is not an error in this backend.
        let mut inner = self.inner.write().await;
        if inner.docs.remove(url).is_some() {
            inner.order.retain(|u| u != url);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.docs.clear();
        inner.order.clear();
        inner.last_indexed = None;
        Ok(())
    }

    async fn stats(&self) -> Result<StorageStats> {
        let inner = self.inner.read().await;
        Ok(StorageStats {
            document_count: inner.docs.len() as u64,
            last_indexed: inner.last_indexed,
        })
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MetaValue;

    fn doc(url: &str, title: &str, content: &str) -> Document {
        Document::new(url).with_title(title).with_content(content)
    }

    #[tokio::test]
    async fn store_then_get_round_trips() {
        let storage = MemoryStorage::new();
        let d = doc("https://example.test/", "Home", "hello world")
            .with_metadata("crawled_at", MetaValue::from(Utc::now()));
        storage.store(d.clone()).await.unwrap();

        let got = storage.get("https://example.test/").await.unwrap();
        assert_eq!(got.url, d.url);
        assert_eq!(got.title, d.title);
        assert_eq!(got.content, d.content);
        assert_eq!(got.doc_type, "webpage");
        assert_eq!(got.metadata, d.metadata);
    }

    #[tokio::test]
    async fn get_missing_returns_not_found() {
        let storage = MemoryStorage::new();
        let err = storage.get("https://example.test/nope").await.unwrap_err();
        assert!(matches!(err, StorageError::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn same_url_collapses_latest_write_wins() {
        let storage = MemoryStorage::new();
        storage.store(doc("https://example.test/", "v1", "a")).await.unwrap();
        storage.store(doc("https://example.test/", "v2", "b")).await.unwrap();

        let all = storage.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "v2");
    }

    #[tokio::test]
    async fn delete_missing_is_not_an_error() {
        let storage = MemoryStorage::new();
        storage.delete("https://example.test/nope").await.unwrap();
    }

    #[tokio::test]
    async fn clear_resets_everything() {
        let storage = MemoryStorage::new();
        storage.batch_store(vec![
            doc("https://example.test/1", "one", "x"),
            doc("https://example.test/2", "two", "y"),
        ]).await.unwrap();

        storage.clear().await.unwrap();

        assert!(storage.get_all().await.unwrap().is_empty());
        assert_eq!(storage.stats().await.unwrap().document_count, 0);
    }

    #[tokio::test]
    async fn get_all_preserves_insertion_order() {
        let storage = MemoryStorage::new();
        for i in 0..5 {
            storage
                .store(doc(&format!("https://example.test/{i}"), "t", "c"))
                .await
                .unwrap();
        }
        let urls: Vec<_> = storage
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.url)
            .collect();
        assert_eq!(urls[0], "https://example.test/0");
        assert_eq!(urls[4], "https://example.test/4");
    }
}
