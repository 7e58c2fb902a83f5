use std::collections::HashMap;

use prometheus::proto::MetricType;
use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use thiserror::Error;

use crate::component::ComponentMetrics;

/// One sample of a gathered metric, flattened for the diagnostic query API.
#[derive(Debug, Clone)]
pub struct MetricSample {
    pub name: String,
    pub labels: HashMap<String, String>,
    pub value: f64,
}

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("metrics registry error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("push gateway error: {0}")]
    Push(String),
}

pub type Result<T> = std::result::Result<T, MetricsError>;

/// All metric families the application publishes, registered once against a
/// single prometheus registry.
///
/// Per-page families carry `component_id` and `component_type` labels so a
/// crawl invocation can be told apart from any other publisher.
pub struct MetricsRegistry {
    registry: Registry,

    pub(crate) pages_processed: CounterVec,
    pub(crate) errors: CounterVec,
    pub(crate) active_requests: GaugeVec,
    pub(crate) response_size: HistogramVec,
    pub(crate) request_duration: HistogramVec,
    pub(crate) page_depth: HistogramVec,
    pub(crate) links_per_page: HistogramVec,
    pub(crate) crawl_duration: HistogramVec,

    pub(crate) search_duration: HistogramVec,
    pub(crate) search_errors: CounterVec,
    pub(crate) search_results: GaugeVec,
    pub(crate) indexed_documents: GaugeVec,
    pub(crate) list_duration: HistogramVec,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let component_labels = &["component_id", "component_type"];

        let pages_processed = CounterVec::new(
            Opts::new("pages_processed_total", "Total pages fetched and extracted"),
            component_labels,
        )?;
        let errors = CounterVec::new(
            Opts::new("errors_total", "Total page-level errors"),
            component_labels,
        )?;
        let active_requests = GaugeVec::new(
            Opts::new("active_requests", "Fetches currently in flight"),
            component_labels,
        )?;
        let response_size = HistogramVec::new(
            HistogramOpts::new("response_sizes_bytes", "Fetched body sizes")
                .buckets(prometheus::exponential_buckets(256.0, 4.0, 10)?),
            component_labels,
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new("request_duration_seconds", "Fetch round-trip latency")
                .buckets(prometheus::exponential_buckets(0.01, 2.0, 12)?),
            component_labels,
        )?;
        let page_depth = HistogramVec::new(
            HistogramOpts::new("page_depth", "Depth at which pages were fetched")
                .buckets(prometheus::linear_buckets(0.0, 1.0, 12)?),
            component_labels,
        )?;
        let links_per_page = HistogramVec::new(
            HistogramOpts::new("links_per_page", "Outbound links discovered per page")
                .buckets(prometheus::exponential_buckets(1.0, 2.0, 10)?),
            component_labels,
        )?;
        let crawl_duration = HistogramVec::new(
            HistogramOpts::new("crawl_duration_seconds", "Wall-clock duration of whole crawls")
                .buckets(prometheus::exponential_buckets(0.1, 2.0, 12)?),
            component_labels,
        )?;

        let search_duration = HistogramVec::new(
            HistogramOpts::new("search_duration_seconds", "Query execution latency")
                .buckets(prometheus::exponential_buckets(0.001, 2.0, 12)?),
            component_labels,
        )?;
        let search_errors = CounterVec::new(
            Opts::new("search_errors_total", "Failed search invocations"),
            component_labels,
        )?;
        let search_results = GaugeVec::new(
            Opts::new("search_results_total", "Matching documents for the last search"),
            component_labels,
        )?;
        let indexed_documents = GaugeVec::new(
            Opts::new("indexed_documents_total", "Documents currently in the index"),
            component_labels,
        )?;
        let list_duration = HistogramVec::new(
            HistogramOpts::new("list_documents_duration_seconds", "List operation latency")
                .buckets(prometheus::exponential_buckets(0.001, 2.0, 12)?),
            component_labels,
        )?;

        registry.register(Box::new(pages_processed.clone()))?;
        registry.register(Box::new(errors.clone()))?;
        registry.register(Box::new(active_requests.clone()))?;
        registry.register(Box::new(response_size.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(page_depth.clone()))?;
        registry.register(Box::new(links_per_page.clone()))?;
        registry.register(Box::new(crawl_duration.clone()))?;
        registry.register(Box::new(search_duration.clone()))?;
        registry.register(Box::new(search_errors.clone()))?;
        registry.register(Box::new(search_results.clone()))?;
        registry.register(Box::new(indexed_documents.clone()))?;
        registry.register(Box::new(list_duration.clone()))?;

        Ok(Self {
            registry,
            pages_processed,
            errors,
            active_requests,
            response_size,
            request_duration,
            page_depth,
            links_per_page,
            crawl_duration,
            search_duration,
            search_errors,
            search_results,
            indexed_documents,
            list_duration,
        })
    }

    /// Creates a metrics handle for one component instance. The id is unique
    /// per call, so two crawls in one process stay distinguishable.
    pub fn component(&self, component_type: &str) -> ComponentMetrics {
        ComponentMetrics::new(self, component_type)
    }

    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }

    /// Renders the registry in the prometheus text exposition format.
    pub fn encode_text(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Returns the current samples of the family called `name`, for the
    /// `/api/v1/query` diagnostic endpoint. Histograms report their sample
    /// count.
    pub fn query(&self, name: &str) -> Vec<MetricSample> {
        let mut samples = Vec::new();
        for family in self.registry.gather() {
            if family.get_name() != name {
                continue;
            }
            for metric in family.get_metric() {
                let labels: HashMap<String, String> = metric
                    .get_label()
                    .iter()
                    .map(|p| (p.get_name().to_string(), p.get_value().to_string()))
                    .collect();
                let value = match family.get_field_type() {
                    MetricType::COUNTER => metric.get_counter().get_value(),
                    MetricType::GAUGE => metric.get_gauge().get_value(),
                    MetricType::HISTOGRAM => metric.get_histogram().get_sample_count() as f64,
                    _ => continue,
                };
                samples.push(MetricSample {
                    name: name.to_string(),
                    labels,
                    value,
                });
            }
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn families_register_without_collision() {
        let registry = Arc::new(MetricsRegistry::new().unwrap());
        let m = registry.component("crawler");
        m.inc_pages_processed();
        m.inc_errors();
        m.observe_page_depth(2.0);

        let text = registry.encode_text().unwrap();
        assert!(text.contains("pages_processed_total"));
        assert!(text.contains("errors_total"));
        assert!(text.contains("component_id"));
    }

    #[test]
    fn two_components_get_distinct_ids() {
        let registry = Arc::new(MetricsRegistry::new().unwrap());
        let a = registry.component("crawler");
        let b = registry.component("crawler");
        assert_ne!(a.component_id(), b.component_id());
    }
}
