use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::extractor::ExtractedPage;

/// Callback invoked for every extracted page, after extraction and before
/// link expansion. Errors are logged by the scheduler and never abort the
/// crawl.
#[async_trait]
pub trait PageHandler: Send + Sync {
    async fn handle(&self, page: &ExtractedPage) -> Result<()>;
}

/// The default handler when none is injected: log and move on.
pub struct LogHandler;

#[async_trait]
impl PageHandler for LogHandler {
    async fn handle(&self, page: &ExtractedPage) -> Result<()> {
        debug!(
            url = %page.url,
            title = %page.title,
            links = page.links.len(),
            "extracted page"
        );
        Ok(())
    }
}
