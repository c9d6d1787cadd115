//! Metrics collection and exposition.
//!
//! # Metrics
//! - `taskgate_submissions_total{kind}` (counter): tasks published by the gateway
//! - `taskgate_publish_failures_total{topic}` (counter)
//! - `taskgate_retrievals_total{outcome}` (counter): found / pending / error
//! - `taskgate_wait_duration_seconds{outcome}` (histogram): completed / timeout / error
//! - `taskgate_abandoned_waits_total` (counter): clients gone mid-wait
//! - `taskgate_tasks_processed_total{outcome}` (counter): done / failed
//! - `taskgate_task_duration_seconds` (histogram)
//! - `taskgate_completions_recorded_total{outcome}` (counter): recorded / store_error
//! - `taskgate_decode_failures_total{topic}` (counter)
//! - `taskgate_expired_records_total` (counter)
//!
//! Recording is a no-op until `init_metrics` installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_submission(kind: &'static str) {
    counter!("taskgate_submissions_total", "kind" => kind).increment(1);
}

pub fn record_publish_failure(topic: &str) {
    counter!("taskgate_publish_failures_total", "topic" => topic.to_string()).increment(1);
}

pub fn record_retrieval(outcome: &'static str) {
    counter!("taskgate_retrievals_total", "outcome" => outcome).increment(1);
}

pub fn record_wait(outcome: &'static str, started: Instant) {
    histogram!("taskgate_wait_duration_seconds", "outcome" => outcome)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_abandoned_wait() {
    counter!("taskgate_abandoned_waits_total").increment(1);
}

pub fn record_task_processed(outcome: &'static str, started: Instant) {
    counter!("taskgate_tasks_processed_total", "outcome" => outcome).increment(1);
    histogram!("taskgate_task_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_completion(outcome: &'static str) {
    counter!("taskgate_completions_recorded_total", "outcome" => outcome).increment(1);
}

pub fn record_decode_failure(topic: &str) {
    counter!("taskgate_decode_failures_total", "topic" => topic.to_string()).increment(1);
}

pub fn record_expired(removed: usize) {
    counter!("taskgate_expired_records_total").increment(removed as u64);
}
