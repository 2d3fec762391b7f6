//! Prometheus metrics for the incident API.
//!
//! Covers HTTP traffic (recorded by [`MetricsLayer`]), store calls (recorded
//! by the service layer) and incident creation counts.
//!
//! # Example
//! ```no_run
//! use incident_report::metrics::HTTP_REQUESTS_TOTAL;
//!
//! HTTP_REQUESTS_TOTAL
//!     .with_label_values(&["GET", "/health", "200"])
//!     .inc();
//! ```

mod middleware;

pub use middleware::{MetricsLayer, MetricsService, UNMATCHED_PATH};

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry,
};
use std::time::Duration;

const NAMESPACE: &str = "incident_report";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    // ============================================================================
    // HTTP Metrics
    // ============================================================================

    /// Total number of HTTP requests received
    ///
    /// Labels: method, path, status_code
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests")
            .namespace(NAMESPACE),
        &["method", "path", "status_code"]
    ).expect("Failed to create HTTP_REQUESTS_TOTAL metric");

    /// HTTP request duration in seconds
    ///
    /// Labels: method, path
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["method", "path"]
    ).expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric");

    /// Number of requests currently being served
    pub static ref HTTP_REQUESTS_IN_FLIGHT: Gauge = Gauge::with_opts(
        Opts::new("http_requests_in_flight", "Number of requests currently being served")
            .namespace(NAMESPACE)
    ).expect("Failed to create HTTP_REQUESTS_IN_FLIGHT metric");

    // ============================================================================
    // Incident Metrics
    // ============================================================================

    /// Total number of incidents created
    ///
    /// Labels: category
    pub static ref INCIDENTS_CREATED_TOTAL: CounterVec = CounterVec::new(
        Opts::new("incidents_created_total", "Total number of incidents created")
            .namespace(NAMESPACE),
        &["category"]
    ).expect("Failed to create INCIDENTS_CREATED_TOTAL metric");

    // ============================================================================
    // Storage Metrics
    // ============================================================================

    /// Total number of storage operations
    ///
    /// Labels: operation, outcome
    pub static ref STORAGE_OPERATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("storage_operations_total", "Total number of storage operations")
            .namespace(NAMESPACE),
        &["operation", "outcome"]
    ).expect("Failed to create STORAGE_OPERATIONS_TOTAL metric");

    /// Storage operation duration in seconds
    ///
    /// Labels: operation
    pub static ref STORAGE_OPERATION_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "storage_operation_duration_seconds",
            "Storage operation duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["operation"]
    ).expect("Failed to create STORAGE_OPERATION_DURATION_SECONDS metric");

    /// Application build info
    ///
    /// Labels: version
    pub static ref BUILD_INFO: GaugeVec = GaugeVec::new(
        Opts::new("build_info", "Application build information")
            .namespace(NAMESPACE),
        &["version"]
    ).expect("Failed to create BUILD_INFO metric");
}

/// Register every metric with [`PROMETHEUS_REGISTRY`].
///
/// Fails if called more than once per process.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(INCIDENTS_CREATED_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(STORAGE_OPERATIONS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(STORAGE_OPERATION_DURATION_SECONDS.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(BUILD_INFO.clone()))?;

    BUILD_INFO
        .with_label_values(&[env!("CARGO_PKG_VERSION")])
        .set(1.0);

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Record the outcome and latency of one store call
pub fn record_storage_operation(operation: &str, success: bool, elapsed: Duration) {
    let outcome = if success { "success" } else { "error" };

    STORAGE_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
    STORAGE_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(elapsed.as_secs_f64());
}

/// Render all registered metrics in the Prometheus text exposition format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        // Registration is global, so a second run in the same process fails
        let _ = init_metrics();
        assert!(init_metrics().is_err());
    }

    #[test]
    fn test_storage_operation_recording() {
        record_storage_operation("find_by_id", true, Duration::from_millis(2));

        let value = STORAGE_OPERATIONS_TOTAL
            .with_label_values(&["find_by_id", "success"])
            .get();
        assert!(value >= 1.0);
    }

    #[test]
    fn test_gather_metrics() {
        let _ = init_metrics();
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let metrics = gather_metrics();
        assert!(metrics.contains("incident_report_http_requests_total"));
    }
}
