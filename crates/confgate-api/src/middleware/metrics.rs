//! # Prometheus Metrics
//!
//! Request, latency and error metrics are recorded in middleware. The
//! validation handler counts completed reports by outcome. Everything is
//! served in the Prometheus text format at `/v1/metrics`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::core::Collector;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Path label for requests that matched no route.
const UNMATCHED_PATH: &str = "unmatched";

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,
    validations_total: IntCounterVec,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

/// Sum of every series in a counter family.
fn counter_total(counter: &IntCounterVec) -> u64 {
    counter
        .collect()
        .iter()
        .flat_map(|family| family.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

impl ApiMetrics {
    /// Create a metrics instance with a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("confgate_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "confgate_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )?;
        let http_errors_total = IntCounterVec::new(
            Opts::new("confgate_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )?;
        let validations_total = IntCounterVec::new(
            Opts::new("confgate_validations_total", "Completed validations by result"),
            &["result"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_errors_total.clone()))?;
        registry.register(Box::new(validations_total.clone()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                validations_total,
            }),
        })
    }

    /// Total requests across all labels.
    pub fn requests(&self) -> u64 {
        counter_total(&self.inner.http_requests_total)
    }

    /// Total 4xx and 5xx responses across all labels.
    pub fn errors(&self) -> u64 {
        counter_total(&self.inner.http_errors_total)
    }

    /// Completed validations with the given result (`pass` or `fail`).
    pub fn validations(&self, result: &str) -> u64 {
        self.inner
            .validations_total
            .get_metric_with_label_values(&[result])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Record one completed validation.
    pub fn record_validation(&self, failed: bool) {
        let result = if failed { "fail" } else { "pass" };
        self.inner
            .validations_total
            .with_label_values(&[result])
            .inc();
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    /// Gather all metrics and encode them in the Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

/// Middleware that records HTTP request metrics.
///
/// Requests are labelled with their route template, so label cardinality is
/// bounded by the router.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_PATH.to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        m.record_request(&method, &path, response.status().as_u16(), duration);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_starts_at_zero() {
        let m = ApiMetrics::new().unwrap();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
        assert_eq!(m.validations("pass"), 0);
        assert_eq!(m.validations("fail"), 0);
    }

    #[test]
    fn requests_and_errors_are_counted_separately() {
        let m = ApiMetrics::new().unwrap();
        for _ in 0..3 {
            m.record_request("POST", "/v1/validate", 200, 0.01);
        }
        m.record_request("POST", "/v1/validate", 400, 0.01);
        m.record_request("GET", "/v1/validate", 405, 0.001);
        assert_eq!(m.requests(), 5);
        assert_eq!(m.errors(), 2);
    }

    #[test]
    fn clone_shares_the_registry() {
        let m = ApiMetrics::new().unwrap();
        let clone = m.clone();
        m.record_validation(false);
        clone.record_validation(true);
        clone.record_validation(true);
        assert_eq!(m.validations("pass"), 1);
        assert_eq!(m.validations("fail"), 2);
    }

    #[test]
    fn gather_and_encode_produces_text() {
        let m = ApiMetrics::new().unwrap();
        m.record_request("POST", "/v1/validate", 200, 0.01);
        m.record_validation(true);
        let output = m.gather_and_encode().unwrap();
        assert!(output.contains("confgate_http_requests_total"));
        assert!(output.contains("confgate_http_request_duration_seconds"));
        assert!(output.contains("confgate_validations_total{result=\"fail\"} 1"));
    }
}
