use std::sync::Arc;

use async_trait::async_trait;
use storage::{Document, MetaValue, StorageAdapter};
use tracing::debug;

use crate::error::Result;
use crate::extractor::ExtractedPage;
use crate::handler::PageHandler;

/// The default production handler: turns every extracted page into a stored
/// document.
pub struct DocumentWriter {
    storage: Arc<dyn StorageAdapter>,
}

impl DocumentWriter {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl PageHandler for DocumentWriter {
    async fn handle(&self, page: &ExtractedPage) -> Result<()> {
        let links: Vec<String> = page.links.iter().map(|u| u.to_string()).collect();

        let doc = Document::new(page.url.to_string())
            .with_title(page.title.clone())
            .with_content(page.content.clone())
            .with_type("webpage")
            .with_metadata("links", MetaValue::from(links))
            .with_metadata("crawled_at", MetaValue::from(page.fetched_at));

        self.storage.store(doc).await?;
        debug!(url = %page.url, "stored document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use storage::MemoryStorage;
    use url::Url;

    #[tokio::test]
    async fn writes_extracted_page_as_webpage_document() {
        let storage = Arc::new(MemoryStorage::new());
        let writer = DocumentWriter::new(storage.clone());

        let page = ExtractedPage {
            url: Url::parse("https://example.test/a").unwrap(),
            title: "A".to_string(),
            content: "alpha beta".to_string(),
            links: vec![Url::parse("https://example.test/b").unwrap()],
            fetched_at: Utc::now(),
        };

        writer.handle(&page).await.unwrap();

        let doc = storage.get("https://example.test/a").await.unwrap();
        assert_eq!(doc.title, "A");
        assert_eq!(doc.content, "alpha beta");
        assert_eq!(doc.doc_type, "webpage");
        assert!(doc.metadata.contains_key("links"));
        assert!(doc.metadata.contains_key("crawled_at"));
    }
}
