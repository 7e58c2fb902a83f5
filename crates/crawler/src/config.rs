use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub parallelism: usize,
    pub crawl_timeout: Duration,
    pub follow_external: bool,
    pub allowed_content_types: Vec<String>,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Minimum interval between requests to the same host, unless the host
    /// has its own entry in `per_host`.
    pub default_interval: Duration,
    pub per_host: HashMap<String, Duration>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; Trawler/0.1)".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            parallelism: 2,
            crawl_timeout: Duration::from_secs(120),
            follow_external: false,
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
                "text/plain".to_string(),
            ],
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_interval: Duration::from_secs(1),
            per_host: HashMap::new(),
        }
    }
}

impl CrawlerConfig {
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn with_crawl_timeout(mut self, crawl_timeout: Duration) -> Self {
        self.crawl_timeout = crawl_timeout;
        self
    }

    pub fn with_follow_external(mut self, follow_external: bool) -> Self {
        self.follow_external = follow_external;
        self
    }

    pub fn with_retry(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_rate_interval(mut self, interval: Duration) -> Self {
        self.rate_limit.default_interval = interval;
        self
    }

    pub fn with_host_rate_interval(
        mut self,
        host: impl Into<String>,
        interval: Duration,
    ) -> Self {
        self.rate_limit.per_host.insert(host.into(), interval);
        self
    }
}
