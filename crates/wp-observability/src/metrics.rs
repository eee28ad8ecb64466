//! Prometheus metrics for Watchpost.
//!
//! Metric names are registered once at startup; the API records them through
//! the helpers below.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

pub const HTTP_REQUESTS_TOTAL: &str = "wp_http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "wp_http_request_duration_seconds";
pub const LOGINS_TOTAL: &str = "wp_logins_total";
pub const INCIDENTS_CREATED_TOTAL: &str = "wp_incidents_created_total";
pub const THREATS_CREATED_TOTAL: &str = "wp_threats_created_total";
pub const ALERTS_CREATED_TOTAL: &str = "wp_alerts_created_total";
pub const RATE_LIMITED_TOTAL: &str = "wp_rate_limited_total";
pub const LOG_STREAM_CLIENTS: &str = "wp_log_stream_clients";

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Failed to install Prometheus recorder: {0}")]
    Install(String),
}

/// Installs the global Prometheus recorder and registers metric descriptions.
///
/// Fails if another recorder is already installed in this process.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;
    register_metrics();
    Ok(handle)
}

/// Registers metric descriptions.
pub fn register_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests handled");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request latency in seconds"
    );
    describe_counter!(LOGINS_TOTAL, "Login attempts by outcome");
    describe_counter!(INCIDENTS_CREATED_TOTAL, "Incidents created by severity");
    describe_counter!(THREATS_CREATED_TOTAL, "Threats recorded by severity");
    describe_counter!(ALERTS_CREATED_TOTAL, "Alerts raised by type");
    describe_counter!(
        RATE_LIMITED_TOTAL,
        "Requests rejected by the per-IP rate limiter"
    );
    describe_gauge!(
        LOG_STREAM_CLIENTS,
        "Number of connected live log stream clients"
    );
}

/// Records a completed HTTP request.
pub fn record_http_request(method: &str, status: u16, duration_seconds: f64) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method.to_string())
        .record(duration_seconds);
}

/// Records a login attempt. `outcome` is `success` or `failure`.
pub fn record_login(outcome: &'static str) {
    counter!(LOGINS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_incident_created(severity: &str) {
    counter!(INCIDENTS_CREATED_TOTAL, "severity" => severity.to_string()).increment(1);
}

pub fn record_threat_created(severity: &str) {
    counter!(THREATS_CREATED_TOTAL, "severity" => severity.to_string()).increment(1);
}

pub fn record_alert_created(alert_type: &str) {
    counter!(ALERTS_CREATED_TOTAL, "type" => alert_type.to_string()).increment(1);
}

pub fn record_rate_limited() {
    counter!(RATE_LIMITED_TOTAL).increment(1);
}

pub fn log_stream_connected() {
    gauge!(LOG_STREAM_CLIENTS).increment(1.0);
}

pub fn log_stream_disconnected() {
    gauge!(LOG_STREAM_CLIENTS).decrement(1.0);
}
