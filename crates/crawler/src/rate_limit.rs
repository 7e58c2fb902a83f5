use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use crate::config::RateLimitConfig;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Per-host politeness limiter.
///
/// Consulted by the scheduler before each dispatch, never inside the fetcher.
/// A denial carries the remaining wait, so the caller can reschedule the URL
/// instead of blocking a worker.
pub struct HostRateLimiter {
    config: RateLimitConfig,
    clock: DefaultClock,
    limiters: RwLock<HashMap<String, Arc<DirectLimiter>>>,
}

impl HostRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            clock: DefaultClock::default(),
            limiters: RwLock::new(HashMap::new()),
        }
    }

    /// Records a visit to the URL's host if the interval has elapsed,
    /// otherwise denies with the time left until the next slot.
    pub async fn try_acquire(&self, url: &Url) -> Result<(), Duration> {
        let host = url.host_str().unwrap_or("*").to_string();

        let limiter = {
            let limiters = self.limiters.read().await;
            limiters.get(&host).cloned()
        };
        let limiter = match limiter {
            Some(l) => l,
            None => {
                let mut limiters = self.limiters.write().await;
                limiters
                    .entry(host.clone())
                    .or_insert_with(|| Arc::new(RateLimiter::direct(self.quota_for(&host))))
                    .clone()
            }
        };

        match limiter.check() {
            Ok(()) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(self.clock.now());
                debug!(host = %host, wait_ms = wait.as_millis() as u64, "rate limited");
                Err(wait)
            }
        }
    }

    fn quota_for(&self, host: &str) -> Quota {
        let interval = self
            .config
            .per_host
            .get(host)
            .copied()
            .unwrap_or(self.config.default_interval)
            .max(Duration::from_millis(1));
        Quota::with_period(interval).unwrap().allow_burst(nonzero!(1u32))
    }
}
