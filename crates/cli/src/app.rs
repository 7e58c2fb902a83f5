use std::sync::Arc;

use anyhow::Context;
use crawler::{Crawler, CrawlerConfig};
use metrics::MetricsRegistry;
use search::SearchEngine;
use storage::{StorageAdapter, TantivyStorage};

/// Where the on-disk index lives, relative to the working directory.
pub const INDEX_DIR: &str = "data/search.tantivy";

/// The explicit construction graph: storage first, then metrics, then the
/// services that borrow them. Teardown runs in reverse via [`App::close`].
pub struct App {
    pub storage: Arc<dyn StorageAdapter>,
    pub registry: Arc<MetricsRegistry>,
    pub engine: SearchEngine,
    pub crawler: Crawler,
}

impl App {
    pub fn open() -> anyhow::Result<Self> {
        let storage: Arc<dyn StorageAdapter> = Arc::new(
            TantivyStorage::open(INDEX_DIR)
                .with_context(|| format!("failed to open search index at {INDEX_DIR}"))?,
        );
        let registry = Arc::new(MetricsRegistry::new()?);
        let engine = SearchEngine::new(Arc::clone(&storage));
        let crawler = Crawler::new(CrawlerConfig::default(), Arc::clone(&registry))?;

        Ok(Self {
            storage,
            registry,
            engine,
            crawler,
        })
    }

    pub async fn close(self) -> anyhow::Result<()> {
        self.storage
            .close()
            .await
            .context("failed to close storage")?;
        Ok(())
    }
}
