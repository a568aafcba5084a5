//! Prometheus metrics
//!
//! Collectors live in a process-wide registry. They can be updated before
//! [`init_metrics`] is called; registration only makes them visible to
//! [`gather_metrics`].

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, HistogramOpts, HistogramVec, Opts, Registry};

const NAMESPACE: &str = "medicine_search";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Initialization attempts
    ///
    /// Labels: outcome (success, failure)
    pub static ref INITIALIZATION_ATTEMPTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("initialization_attempts_total", "Total number of index initialization attempts")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create INITIALIZATION_ATTEMPTS_TOTAL metric");

    /// Documents acknowledged by bulk requests
    pub static ref DOCUMENTS_IMPORTED_TOTAL: Counter = Counter::with_opts(
        Opts::new("documents_imported_total", "Total number of documents imported")
            .namespace(NAMESPACE)
    ).expect("Failed to create DOCUMENTS_IMPORTED_TOTAL metric");

    /// Bulk requests issued
    ///
    /// Labels: status (success, failure)
    pub static ref IMPORT_BATCHES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("import_batches_total", "Total number of bulk import batches")
            .namespace(NAMESPACE),
        &["status"]
    ).expect("Failed to create IMPORT_BATCHES_TOTAL metric");

    /// Read queries served
    ///
    /// Labels: operation, status (success, failure)
    pub static ref QUERIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("queries_total", "Total number of catalog queries")
            .namespace(NAMESPACE),
        &["operation", "status"]
    ).expect("Failed to create QUERIES_TOTAL metric");

    /// Query latency including the readiness check
    ///
    /// Labels: operation
    pub static ref QUERY_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new("query_duration_seconds", "Catalog query duration in seconds")
            .namespace(NAMESPACE)
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["operation"]
    ).expect("Failed to create QUERY_DURATION_SECONDS metric");
}

/// Register all collectors with [`PROMETHEUS_REGISTRY`]
pub fn init_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(INITIALIZATION_ATTEMPTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(DOCUMENTS_IMPORTED_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(IMPORT_BATCHES_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(QUERIES_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(QUERY_DURATION_SECONDS.clone()))?;

    tracing::debug!("Prometheus metrics registered");
    Ok(())
}

/// Render all registered metrics in the text exposition format
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
