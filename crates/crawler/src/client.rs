use std::sync::Arc;

use bytes::Bytes;
use reqwest::Client as ReqwestClient;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::config::CrawlerConfig;
use crate::error::{CrawlerError, Result};

/// One fetched response body plus the headers the pipeline cares about.
#[derive(Debug)]
pub struct FetchedPage {
    pub status: u16,
    pub body: Bytes,
    pub content_type: Option<String>,
    pub size: usize,
}

/// HTTP fetcher with retry-on-5xx.
///
/// Keep-alives are disabled by default so a crawl does not pin sockets to
/// every host it touches.
pub struct Fetcher {
    client: ReqwestClient,
    config: Arc<CrawlerConfig>,
}

impl Fetcher {
    pub fn new(config: Arc<CrawlerConfig>) -> Result<Self> {
        let client = ReqwestClient::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self { client, config })
    }

    /// Fetches `url`, retrying 5xx responses with a linearly growing delay.
    /// Any other failure is terminal. The cancellation token aborts both
    /// in-flight requests and backoff sleeps.
    pub async fn fetch(&self, url: &Url, cancel: &CancellationToken) -> Result<FetchedPage> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            let response = tokio::select! {
                _ = cancel.cancelled() => return Err(CrawlerError::Cancelled),
                r = self.client.get(url.as_str()).send() => r?,
            };

            let status = response.status();
            if status.is_server_error() && attempt <= self.config.max_retries {
                let delay = self.config.retry_delay * attempt;
                warn!(
                    url = %url,
                    status = status.as_u16(),
                    attempt,
                    delay_secs = delay.as_secs(),
                    "server error, retrying"
                );
                tokio::select! {
                    _ = cancel.cancelled() => return Err(CrawlerError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                continue;
            }

            if !status.is_success() {
                return Err(CrawlerError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());

            if let Some(ct) = &content_type {
                if !self.is_allowed_content_type(ct) {
                    return Err(CrawlerError::UnsupportedContentType(ct.clone()));
                }
            }

            let body = tokio::select! {
                _ = cancel.cancelled() => return Err(CrawlerError::Cancelled),
                b = response.bytes() => b?,
            };

            debug!(url = %url, bytes = body.len(), "fetched");
            return Ok(FetchedPage {
                status: status.as_u16(),
                size: body.len(),
                content_type,
                body,
            });
        }
    }

    fn is_allowed_content_type(&self, content_type: &str) -> bool {
        self.config
            .allowed_content_types
            .iter()
            .any(|allowed| content_type.starts_with(allowed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_gate_matches_prefixes() {
        let fetcher = Fetcher::new(Arc::new(CrawlerConfig::default())).unwrap();

        assert!(fetcher.is_allowed_content_type("text/html"));
        assert!(fetcher.is_allowed_content_type("text/html; charset=utf-8"));
        assert!(fetcher.is_allowed_content_type("text/plain"));
        assert!(!fetcher.is_allowed_content_type("image/png"));
        assert!(!fetcher.is_allowed_content_type("application/pdf"));
    }
}
