//! Prometheus metrics for the HTTP façade.

use axum::http::Method;
use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

/// Labels for HTTP request metrics.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabels {
    pub method: HttpMethod,
    pub endpoint: String,
    pub status: u16,
}

/// HTTP method label value.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
    Other,
}

impl From<&Method> for HttpMethod {
    fn from(method: &Method) -> Self {
        match *method {
            Method::GET => HttpMethod::Get,
            Method::POST => HttpMethod::Post,
            Method::DELETE => HttpMethod::Delete,
            _ => HttpMethod::Other,
        }
    }
}

/// Container for all Prometheus metrics.
pub struct Metrics {
    registry: Registry,

    /// Counter of log entries successfully appended.
    pub entries_appended_total: Counter,

    /// Counter of entries removed by prune operations.
    pub entries_pruned_total: Counter,

    /// Counter of stat increment operations applied.
    pub stat_increments_total: Counter,

    /// Counter of HTTP requests.
    pub http_requests_total: Family<HttpLabels, Counter>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics registry with all metrics registered.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let entries_appended_total = Counter::default();
        registry.register(
            "entries_appended_total",
            "Total number of log entries appended",
            entries_appended_total.clone(),
        );

        let entries_pruned_total = Counter::default();
        registry.register(
            "entries_pruned_total",
            "Total number of log entries removed by prune",
            entries_pruned_total.clone(),
        );

        let stat_increments_total = Counter::default();
        registry.register(
            "stat_increments_total",
            "Total number of stat increment operations applied",
            stat_increments_total.clone(),
        );

        let http_requests_total = Family::<HttpLabels, Counter>::default();
        registry.register(
            "http_requests_total",
            "Total number of HTTP requests",
            http_requests_total.clone(),
        );

        Self {
            registry,
            entries_appended_total,
            entries_pruned_total,
            stat_increments_total,
            http_requests_total,
        }
    }

    /// Encode all metrics to Prometheus text format.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, &self.registry)
            .expect("encoding metrics should not fail");
        buffer
    }
}
