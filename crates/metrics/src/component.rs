use prometheus::{CounterVec, GaugeVec, HistogramVec};
use uuid::Uuid;

use crate::registry::MetricsRegistry;

/// Per-component metrics handle.
///
/// Every observation carries this handle's `component_id` and
/// `component_type` labels. The underlying vectors are shared with the
/// registry, so cloning here is cheap.
#[derive(Clone)]
pub struct ComponentMetrics {
    component_id: String,
    component_type: String,

    pages_processed: CounterVec,
    errors: CounterVec,
    active_requests: GaugeVec,
    response_size: HistogramVec,
    request_duration: HistogramVec,
    page_depth: HistogramVec,
    links_per_page: HistogramVec,
    crawl_duration: HistogramVec,
    search_duration: HistogramVec,
    search_errors: CounterVec,
    search_results: GaugeVec,
    indexed_documents: GaugeVec,
    list_duration: HistogramVec,
}

impl ComponentMetrics {
    pub(crate) fn new(registry: &MetricsRegistry, component_type: &str) -> Self {
        Self {
            component_id: format!("{component_type}-{}", Uuid::new_v4()),
            component_type: component_type.to_string(),
            pages_processed: registry.pages_processed.clone(),
            errors: registry.errors.clone(),
            active_requests: registry.active_requests.clone(),
            response_size: registry.response_size.clone(),
            request_duration: registry.request_duration.clone(),
            page_depth: registry.page_depth.clone(),
            links_per_page: registry.links_per_page.clone(),
            crawl_duration: registry.crawl_duration.clone(),
            search_duration: registry.search_duration.clone(),
            search_errors: registry.search_errors.clone(),
            search_results: registry.search_results.clone(),
            indexed_documents: registry.indexed_documents.clone(),
            list_duration: registry.list_duration.clone(),
        }
    }

    pub fn component_id(&self) -> &str {
        &self.component_id
    }

    fn labels(&self) -> [&str; 2] {
        [self.component_id.as_str(), self.component_type.as_str()]
    }

    pub fn inc_pages_processed(&self) {
        self.pages_processed.with_label_values(&self.labels()).inc();
    }

    pub fn inc_errors(&self) {
        self.errors.with_label_values(&self.labels()).inc();
    }

    pub fn inc_active_requests(&self) {
        self.active_requests.with_label_values(&self.labels()).inc();
    }

    pub fn dec_active_requests(&self) {
        self.active_requests.with_label_values(&self.labels()).dec();
    }

    pub fn observe_response_size(&self, bytes: f64) {
        self.response_size
            .with_label_values(&self.labels())
            .observe(bytes);
    }

    pub fn observe_request_duration(&self, seconds: f64) {
        self.request_duration
            .with_label_values(&self.labels())
            .observe(seconds);
    }

    pub fn observe_page_depth(&self, depth: f64) {
        self.page_depth
            .with_label_values(&self.labels())
            .observe(depth);
    }

    pub fn observe_links_per_page(&self, links: f64) {
        self.links_per_page
            .with_label_values(&self.labels())
            .observe(links);
    }

    pub fn observe_crawl_duration(&self, seconds: f64) {
        self.crawl_duration
            .with_label_values(&self.labels())
            .observe(seconds);
    }

    pub fn observe_search_duration(&self, seconds: f64) {
        self.search_duration
            .with_label_values(&self.labels())
            .observe(seconds);
    }

    pub fn inc_search_errors(&self) {
        self.search_errors.with_label_values(&self.labels()).inc();
    }

    pub fn set_search_results(&self, total: f64) {
        self.search_results
            .with_label_values(&self.labels())
            .set(total);
    }

    pub fn set_indexed_documents(&self, count: f64) {
        self.indexed_documents
            .with_label_values(&self.labels())
            .set(count);
    }

    pub fn observe_list_duration(&self, seconds: f64) {
        self.list_duration
            .with_label_values(&self.labels())
            .observe(seconds);
    }
}
