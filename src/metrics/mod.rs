//! Metrics module
//!
//! Prometheus counters and histograms for the upload pipeline.

pub mod server;

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, register_histogram_vec, Counter,
    CounterVec, Histogram, HistogramVec,
};

lazy_static! {
    // Upload metrics
    pub static ref UPLOADS_TOTAL: CounterVec = register_counter_vec!(
        "reel_uploads_total",
        "Total number of uploads",
        &["kind", "status"] // kind: "video" or "thumbnail"
    ).unwrap();

    pub static ref UPLOAD_BYTES_TOTAL: Counter = register_counter!(
        "reel_upload_bytes_total",
        "Total bytes received into scratch storage"
    ).unwrap();

    pub static ref PIPELINE_DURATION: Histogram = register_histogram!(
        "reel_pipeline_duration_seconds",
        "End-to-end video pipeline duration in seconds",
        vec![0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    ).unwrap();

    pub static ref PIPELINE_FAILURES: CounterVec = register_counter_vec!(
        "reel_pipeline_failures_total",
        "Pipeline failures by the state being entered",
        &["state"]
    ).unwrap();

    pub static ref ORIENTATION_TOTAL: CounterVec = register_counter_vec!(
        "reel_orientation_total",
        "Classified uploads per orientation bucket",
        &["bucket"]
    ).unwrap();

    // Subprocess metrics
    pub static ref PROCESS_DURATION: HistogramVec = register_histogram_vec!(
        "reel_process_duration_seconds",
        "External media process duration in seconds",
        &["command", "status"],
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 120.0]
    ).unwrap();

    // Auth metrics
    pub static ref AUTH_ATTEMPTS: CounterVec = register_counter_vec!(
        "reel_auth_attempts_total",
        "Authentication attempts",
        &["status"]
    ).unwrap();
}

/// Record a successful upload
pub fn record_upload_success(kind: &str) {
    UPLOADS_TOTAL.with_label_values(&[kind, "success"]).inc();
}

/// Record a failed upload
pub fn record_upload_failure(kind: &str) {
    UPLOADS_TOTAL.with_label_values(&[kind, "failure"]).inc();
}

/// Record bytes staged to disk
pub fn record_upload_bytes(bytes: u64) {
    UPLOAD_BYTES_TOTAL.inc_by(bytes as f64);
}

pub fn record_pipeline_duration(duration_secs: f64) {
    PIPELINE_DURATION.observe(duration_secs);
}

/// Record a pipeline failure against the state it was entering
pub fn record_pipeline_failure(state: &str) {
    PIPELINE_FAILURES.with_label_values(&[state]).inc();
}

pub fn record_orientation(bucket: &str) {
    ORIENTATION_TOTAL.with_label_values(&[bucket]).inc();
}

/// Record an external process run
///
/// `status` is "success" or a [`ProcessError::kind`](crate::media::ProcessError::kind).
pub fn record_process(command: &str, status: &str, duration_secs: f64) {
    PROCESS_DURATION
        .with_label_values(&[command, status])
        .observe(duration_secs);
}

/// Record authentication attempt
pub fn record_auth_attempt(success: bool) {
    let status = if success { "success" } else { "failure" };
    AUTH_ATTEMPTS.with_label_values(&[status]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_upload_success() {
        record_upload_success("video");
        // Just verify it doesn't panic
    }

    #[test]
    fn test_record_pipeline_failure_counts() {
        let before = PIPELINE_FAILURES.with_label_values(&["Remuxed"]).get();
        record_pipeline_failure("Remuxed");
        let after = PIPELINE_FAILURES.with_label_values(&["Remuxed"]).get();
        assert!(after >= before + 1.0);
    }

    #[test]
    fn test_record_process() {
        record_process("ffprobe", "success", 0.02);
        // Just verify it doesn't panic
    }
}
