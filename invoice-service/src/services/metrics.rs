//! Prometheus metrics for invoice-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    HistogramVec, TextEncoder,
};

/// Upload pipeline outcomes: parsed, rejected (extraction failure), failed.
pub static UPLOADS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoice_uploads_total",
        "Total number of uploaded documents by outcome",
        &["outcome"]
    )
    .expect("Failed to register uploads_total")
});

/// Documents with no text layer that went through OCR.
pub static OCR_FALLBACKS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "invoice_ocr_fallbacks_total",
        "Total number of documents recognized via the OCR fallback"
    )
    .expect("Failed to register ocr_fallbacks_total")
});

/// Pipeline stage duration histogram.
pub static PIPELINE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "invoice_pipeline_duration_seconds",
        "Extraction pipeline stage duration in seconds",
        &["stage"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("Failed to register pipeline_duration")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "invoice_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoice_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&UPLOADS_TOTAL);
    Lazy::force(&OCR_FALLBACKS_TOTAL);
    Lazy::force(&PIPELINE_DURATION);
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&ERRORS_TOTAL);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
