use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all review-server metrics
const PREFIX: &str = "recensio";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    pub static ref AUTH_SIGNUPS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_auth_signups_total"), "Signup attempts"),
        &["status"]
    ).expect("Failed to create auth_signups_total metric");

    pub static ref AUTH_TOKENS_ISSUED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_auth_tokens_issued_total"),
        "Bearer tokens issued through the confirmation flow"
    ).expect("Failed to create auth_tokens_issued_total metric");

    pub static ref CATALOG_ITEMS_TOTAL: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_catalog_items_total"), "Total items in the catalog"),
        &["type"]
    ).expect("Failed to create catalog_items_total metric");

    pub static ref ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_errors_total"), "Total errors by type"),
        &["error_type"]
    ).expect("Failed to create errors_total metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // ignore errors if already registered (happens in tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(AUTH_SIGNUPS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(AUTH_TOKENS_ISSUED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CATALOG_ITEMS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ERRORS_TOTAL.clone()));

    tracing::info!("Metrics system initialized");
}

pub fn init_catalog_metrics(num_categories: usize, num_genres: usize, num_titles: usize) {
    CATALOG_ITEMS_TOTAL
        .with_label_values(&["category"])
        .set(num_categories as f64);
    CATALOG_ITEMS_TOTAL
        .with_label_values(&["genre"])
        .set(num_genres as f64);
    CATALOG_ITEMS_TOTAL
        .with_label_values(&["title"])
        .set(num_titles as f64);

    tracing::info!(
        "Catalog metrics initialized: {} categories, {} genres, {} titles",
        num_categories,
        num_genres,
        num_titles
    );
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

pub fn record_signup(status: &str) {
    AUTH_SIGNUPS_TOTAL.with_label_values(&[status]).inc();
}

pub fn record_token_issued() {
    AUTH_TOKENS_ISSUED_TOTAL.inc();
}

pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
