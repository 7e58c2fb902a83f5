use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{ComponentMetrics, MetricsRegistry};
use tokio::sync::{mpsc, Mutex, Notify, RwLock};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::client::Fetcher;
use crate::config::CrawlerConfig;
use crate::error::{CrawlerError, Result};
use crate::extractor::{ExtractedPage, PageExtractor};
use crate::handler::PageHandler;
use crate::normalize::normalize;
use crate::rate_limit::HostRateLimiter;

/// What a finished crawl reports back to the caller.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub pages_processed: u64,
    pub errors: u64,
    pub duration: Duration,
}

#[derive(Debug)]
struct CrawlJob {
    url: Url,
    depth: usize,
}

/// Bounded-depth, single-host crawl scheduler.
///
/// Workers cooperate through a shared queue and a shared visited set.
/// Membership in the visited set is taken at enqueue time, which is what
/// guarantees a URL is fetched at most once even with concurrent workers.
/// The crawl completes when the queue is drained and nothing is in flight,
/// tracked by a single pending-work counter: incremented at enqueue,
/// decremented when a job's fan-out is done.
pub struct CrawlScheduler {
    config: Arc<CrawlerConfig>,
    fetcher: Arc<Fetcher>,
    limiter: Arc<HostRateLimiter>,
    registry: Arc<MetricsRegistry>,
}

impl CrawlScheduler {
    pub fn new(config: CrawlerConfig, registry: Arc<MetricsRegistry>) -> Result<Self> {
        let config = Arc::new(config);
        let fetcher = Arc::new(Fetcher::new(Arc::clone(&config))?);
        let limiter = Arc::new(HostRateLimiter::new(config.rate_limit.clone()));
        Ok(Self {
            config,
            fetcher,
            limiter,
            registry,
        })
    }

    pub async fn crawl(
        &self,
        seed: &str,
        max_depth: usize,
        handler: Arc<dyn PageHandler>,
    ) -> Result<CrawlReport> {
        self.crawl_with_cancellation(seed, max_depth, handler, CancellationToken::new())
            .await
    }

    pub async fn crawl_with_cancellation(
        &self,
        seed: &str,
        max_depth: usize,
        handler: Arc<dyn PageHandler>,
        cancel: CancellationToken,
    ) -> Result<CrawlReport> {
        let seed_url = Url::parse(seed).map_err(|e| CrawlerError::InvalidSeed {
            url: seed.to_string(),
            reason: e.to_string(),
        })?;
        let seed_norm =
            normalize(&seed_url, seed_url.as_str()).ok_or_else(|| CrawlerError::InvalidSeed {
                url: seed.to_string(),
                reason: "not a crawlable http(s) URL".to_string(),
            })?;
        let allowed_host = match seed_norm.host_str() {
            Some(host) => host.to_string(),
            None => {
                return Err(CrawlerError::InvalidSeed {
                    url: seed.to_string(),
                    reason: "seed URL has no host".to_string(),
                })
            }
        };

        // One metrics component per crawl invocation.
        let metrics = self.registry.component("crawler");
        let started = Instant::now();

        let (tx, rx) = mpsc::unbounded_channel::<CrawlJob>();
        let shared = Arc::new(CrawlShared {
            config: Arc::clone(&self.config),
            fetcher: Arc::clone(&self.fetcher),
            limiter: Arc::clone(&self.limiter),
            metrics: metrics.clone(),
            handler,
            allowed_host,
            max_depth,
            visited: RwLock::new(HashSet::from([seed_norm.as_str().to_string()])),
            pending: AtomicUsize::new(0),
            pages: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            done: Notify::new(),
            shutdown: cancel.child_token(),
            tx,
        });

        info!(
            seed = %seed_norm,
            max_depth,
            parallelism = self.config.parallelism,
            component_id = metrics.component_id(),
            "starting crawl"
        );
        shared.enqueue(CrawlJob {
            url: seed_norm,
            depth: 0,
        });

        let queue = Arc::new(Mutex::new(rx));
        let mut workers = JoinSet::new();
        for worker_id in 0..self.config.parallelism.max(1) {
            let shared = Arc::clone(&shared);
            let queue = Arc::clone(&queue);
            workers.spawn(async move {
                loop {
                    let job = tokio::select! {
                        _ = shared.shutdown.cancelled() => break,
                        job = async { queue.lock().await.recv().await } => match job {
                            Some(job) => job,
                            None => break,
                        },
                    };
                    debug!(worker_id, url = %job.url, depth = job.depth, "dequeued");
                    Arc::clone(&shared).process(job).await;
                }
            });
        }

        let outcome = tokio::select! {
            _ = shared.done.notified() => Ok(()),
            _ = tokio::time::sleep(self.config.crawl_timeout) => {
                Err(CrawlerError::Timeout(self.config.crawl_timeout))
            }
            _ = cancel.cancelled() => Err(CrawlerError::Cancelled),
        };

        // Stop dequeuing and let in-flight work drain before returning,
        // regardless of how the select resolved.
        shared.shutdown.cancel();
        while workers.join_next().await.is_some() {}

        let duration = started.elapsed();
        metrics.observe_crawl_duration(duration.as_secs_f64());

        let report = CrawlReport {
            pages_processed: shared.pages.load(Ordering::Relaxed),
            errors: shared.errors.load(Ordering::Relaxed),
            duration,
        };
        match &outcome {
            Ok(()) => info!(
                pages = report.pages_processed,
                errors = report.errors,
                duration_ms = duration.as_millis() as u64,
                "crawl complete"
            ),
            Err(e) => warn!(
                pages = report.pages_processed,
                errors = report.errors,
                error = %e,
                "crawl aborted"
            ),
        }
        outcome.map(|_| report)
    }
}

struct CrawlShared {
    config: Arc<CrawlerConfig>,
    fetcher: Arc<Fetcher>,
    limiter: Arc<HostRateLimiter>,
    metrics: ComponentMetrics,
    handler: Arc<dyn PageHandler>,
    allowed_host: String,
    max_depth: usize,
    visited: RwLock<HashSet<String>>,
    pending: AtomicUsize,
    pages: AtomicU64,
    errors: AtomicU64,
    done: Notify,
    shutdown: CancellationToken,
    tx: mpsc::UnboundedSender<CrawlJob>,
}

impl CrawlShared {
    fn enqueue(&self, job: CrawlJob) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(job).is_err() {
            self.job_finished();
        }
    }

    /// Marks one unit of pending work as done; the zero-crossing happens
    /// exactly once because new work is only created from inside pending
    /// jobs.
    fn job_finished(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.done.notify_one();
        }
    }

    fn host_allowed(&self, url: &Url) -> bool {
        if self.config.follow_external {
            return true;
        }
        url.host_str().map_or(false, |h| h == self.allowed_host)
    }

    async fn process(self: Arc<Self>, job: CrawlJob) {
        // Politeness gate. A denied job goes back on the queue after the
        // remaining interval; it stays pending the whole time.
        if let Err(retry_after) = self.limiter.try_acquire(&job.url).await {
            let shared = Arc::clone(&self);
            tokio::spawn(async move {
                tokio::select! {
                    _ = shared.shutdown.cancelled() => shared.job_finished(),
                    _ = tokio::time::sleep(retry_after) => {
                        if shared.tx.send(job).is_err() {
                            shared.job_finished();
                        }
                    }
                }
            });
            return;
        }

        self.metrics.inc_active_requests();
        let fetch_started = Instant::now();
        let fetched = self.fetcher.fetch(&job.url, &self.shutdown).await;
        self.metrics.dec_active_requests();

        let page = match fetched {
            Ok(page) => page,
            Err(CrawlerError::Cancelled) => {
                self.job_finished();
                return;
            }
            Err(e) => {
                warn!(url = %job.url, depth = job.depth, error = %e, "fetch failed");
                self.errors.fetch_add(1, Ordering::Relaxed);
                self.metrics.inc_errors();
                self.job_finished();
                return;
            }
        };

        self.metrics
            .observe_request_duration(fetch_started.elapsed().as_secs_f64());
        self.metrics.observe_response_size(page.size as f64);

        let extracted = PageExtractor::extract(&job.url, &page.body);
        self.metrics.observe_page_depth(job.depth as f64);
        self.metrics
            .observe_links_per_page(extracted.links.len() as f64);

        if let Err(e) = self.handler.handle(&extracted).await {
            // Handler failures never abort the crawl.
            warn!(url = %job.url, error = %e, "page handler failed");
            self.errors.fetch_add(1, Ordering::Relaxed);
            self.metrics.inc_errors();
        }

        self.pages.fetch_add(1, Ordering::Relaxed);
        self.metrics.inc_pages_processed();

        self.fan_out(&job, &extracted).await;
        self.job_finished();
    }

    async fn fan_out(&self, job: &CrawlJob, extracted: &ExtractedPage) {
        if job.depth >= self.max_depth || self.shutdown.is_cancelled() {
            return;
        }
        for link in &extracted.links {
            if !self.host_allowed(link) {
                debug!(url = %link, "skipping external host");
                continue;
            }
            let is_new = {
                let mut visited = self.visited.write().await;
                visited.insert(link.as_str().to_string())
            };
            if !is_new {
                continue;
            }
            self.enqueue(CrawlJob {
                url: link.clone(),
                depth: job.depth + 1,
            });
        }
    }
}
