use std::time::Duration;

use tracing::debug;

use crate::registry::{MetricsError, MetricsRegistry, Result};

/// Environment variable overriding the push-gateway target.
pub const PUSHGATEWAY_URL_VAR: &str = "TRAWLER_PUSHGATEWAY_URL";

const DEFAULT_PUSHGATEWAY_URL: &str = "http://pushgateway:9091";

/// Best-effort push-gateway client.
///
/// A missing or unreachable gateway is tolerated; pushes are fire-and-forget
/// from the crawl path and failures only show up at debug level.
pub struct Pusher {
    base_url: String,
    job: String,
    client: reqwest::Client,
}

impl Pusher {
    pub fn new(base_url: impl Into<String>, job: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            job: job.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Builds a pusher from the environment, falling back to the compose
    /// default `http://pushgateway:9091`.
    pub fn from_env(job: impl Into<String>) -> Self {
        let base_url = std::env::var(PUSHGATEWAY_URL_VAR)
            .unwrap_or_else(|_| DEFAULT_PUSHGATEWAY_URL.to_string());
        Self::new(base_url, job)
    }

    pub async fn push(&self, registry: &MetricsRegistry) -> Result<()> {
        let body = registry.encode_text()?;
        let url = format!(
            "{}/metrics/job/{}",
            self.base_url.trim_end_matches('/'),
            self.job
        );

        let response = self
            .client
            .put(&url)
            .header("Content-Type", "text/plain; version=0.0.4")
            .body(body)
            .send()
            .await
            .map_err(|e| MetricsError::Push(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MetricsError::Push(format!(
                "gateway returned {}",
                response.status()
            )));
        }
        debug!(url = %url, "pushed metrics");
        Ok(())
    }

    /// Push, swallowing failures. Used on crawl completion where a down
    /// gateway must not affect the exit code.
    pub async fn push_best_effort(&self, registry: &MetricsRegistry) {
        if let Err(e) = self.push(registry).await {
            debug!(error = %e, "metrics push skipped");
        }
    }
}
