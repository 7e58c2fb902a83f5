//! Bounded-depth, single-host, rate-limited web crawl engine.
//!
//! The [`CrawlScheduler`] drives the pipeline: rate limiter → fetcher →
//! extractor → page handler, feeding discovered links back into itself after
//! normalization. [`DocumentWriter`] is the stock handler that lands every
//! page in storage.

pub mod client;
pub mod config;
pub mod error;
pub mod extractor;
pub mod handler;
pub mod normalize;
pub mod pipeline;
pub mod rate_limit;
pub mod scheduler;

pub use client::{FetchedPage, Fetcher};
pub use config::{CrawlerConfig, RateLimitConfig};
pub use error::{CrawlerError, Result};
pub use extractor::{ExtractedPage, PageExtractor};
pub use handler::{LogHandler, PageHandler};
pub use normalize::normalize;
pub use pipeline::DocumentWriter;
pub use rate_limit::HostRateLimiter;
pub use scheduler::{CrawlReport, CrawlScheduler};

use std::sync::Arc;

use metrics::MetricsRegistry;
use tokio_util::sync::CancellationToken;

/// Convenience front door: a scheduler plus the default-handler plumbing.
pub struct Crawler {
    scheduler: CrawlScheduler,
}

impl Crawler {
    pub fn new(config: CrawlerConfig, registry: Arc<MetricsRegistry>) -> Result<Self> {
        Ok(Self {
            scheduler: CrawlScheduler::new(config, registry)?,
        })
    }

    /// Crawls from `seed` down to `max_depth`. When `handler` is `None`, the
    /// no-op logging handler is used.
    pub async fn crawl(
        &self,
        seed: &str,
        max_depth: usize,
        handler: Option<Arc<dyn PageHandler>>,
    ) -> Result<CrawlReport> {
        let handler = handler.unwrap_or_else(|| Arc::new(LogHandler));
        self.scheduler.crawl(seed, max_depth, handler).await
    }

    pub async fn crawl_with_cancellation(
        &self,
        seed: &str,
        max_depth: usize,
        handler: Option<Arc<dyn PageHandler>>,
        cancel: CancellationToken,
    ) -> Result<CrawlReport> {
        let handler = handler.unwrap_or_else(|| Arc::new(LogHandler));
        self.scheduler
            .crawl_with_cancellation(seed, max_depth, handler, cancel)
            .await
    }
}
