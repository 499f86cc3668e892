//! Metrics module
//!
//! Prometheus metrics for the ingestion pipeline, registered in the default
//! registry and exposed by [`server::MetricsServer`].

pub mod server;

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    HistogramVec,
};

lazy_static! {
    // Upload metrics
    pub static ref UPLOADS_TOTAL: CounterVec = register_counter_vec!(
        "tubely_uploads_total",
        "Total number of video uploads",
        &["status"]
    ).unwrap();

    pub static ref UPLOAD_BYTES_TOTAL: Counter = register_counter!(
        "tubely_upload_bytes_total",
        "Total processed bytes written to the object store"
    ).unwrap();

    pub static ref STAGE_DURATION: HistogramVec = register_histogram_vec!(
        "tubely_stage_duration_seconds",
        "Pipeline stage duration in seconds",
        &["stage"],
        vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 120.0, 600.0]
    ).unwrap();

    // Media metrics
    pub static ref TOOL_INVOCATIONS: CounterVec = register_counter_vec!(
        "tubely_tool_invocations_total",
        "External tool invocations",
        &["tool", "status"]
    ).unwrap();

    pub static ref ASPECT_CLASSES: CounterVec = register_counter_vec!(
        "tubely_aspect_class_total",
        "Classified videos by aspect class",
        &["class"]
    ).unwrap();

    // Auth metrics
    pub static ref AUTH_ATTEMPTS: CounterVec = register_counter_vec!(
        "tubely_auth_attempts_total",
        "Authentication attempts",
        &["method", "status"]
    ).unwrap();

    // Error metrics
    pub static ref ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "tubely_errors_total",
        "Total request errors",
        &["type"]
    ).unwrap();
}

/// Record a successful upload
pub fn record_upload_success(bytes: u64) {
    UPLOADS_TOTAL.with_label_values(&["success"]).inc();
    UPLOAD_BYTES_TOTAL.inc_by(bytes as f64);
}

/// Record a failed upload
pub fn record_upload_failure() {
    UPLOADS_TOTAL.with_label_values(&["failure"]).inc();
}

/// Record how long a pipeline stage took
pub fn record_stage_duration(stage: &str, duration_secs: f64) {
    STAGE_DURATION
        .with_label_values(&[stage])
        .observe(duration_secs);
}

/// Record an external tool run
///
/// `status` is one of `success`, `failure`, `timeout`, `spawn_error`, `io_error`.
pub fn record_tool_invocation(tool: &str, status: &str) {
    TOOL_INVOCATIONS.with_label_values(&[tool, status]).inc();
}

pub fn record_aspect_class(class: &str) {
    ASPECT_CLASSES.with_label_values(&[class]).inc();
}

/// Record authentication attempt
pub fn record_auth_attempt(method: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    AUTH_ATTEMPTS.with_label_values(&[method, status]).inc();
}

/// Record an error
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}
