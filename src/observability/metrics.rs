//! # Metrics Collection
//!
//! Prometheus counters for authentication outcomes and token lifecycle.

use crate::config::ObservabilityConfig;
use crate::errors::{AuthgateError, Result};
use ::tracing::{info, warn};
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Outcome labels for `auth_authentications_total`.
pub const AUTHENTICATION_STATUSES: &[&str] = &[
    "success",
    "invalid_credentials",
    "account_disabled",
    "account_expired",
    "error",
];

/// Outcome labels for `auth_requests_total`.
pub const REQUEST_STATUSES: &[&str] =
    &["authenticated", "anonymous", "unknown_subject", "rejected", "store_unavailable"];

/// Metrics recorder that tracks application metrics
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    /// Create a new metrics recorder instance
    pub fn new() -> Self {
        Self
    }

    /// Record an HTTP request
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration: f64) {
        let request_labels = [("method", method.to_string()), ("path", path.to_string())];
        counter!("http_requests_total", &request_labels).increment(1);

        let status_label = [("status", status.to_string())];
        counter!("http_responses_total", &status_label).increment(1);
        histogram!("http_request_duration_seconds").record(duration);
    }

    /// Record authentication attempt outcome
    pub fn record_authentication(&self, status: &str) {
        let labels = [("status", status.to_string())];
        counter!("auth_authentications_total", &labels).increment(1);
    }

    /// Record how the request filter resolved a request
    pub fn record_request_authentication(&self, status: &str) {
        let labels = [("status", status.to_string())];
        counter!("auth_requests_total", &labels).increment(1);
    }

    /// Record an issued JWT
    pub fn record_token_issued(&self, kind: &str) {
        let labels = [("kind", kind.to_string())];
        counter!("auth_tokens_issued_total", &labels).increment(1);
    }

    /// Record revoked token records
    pub fn record_tokens_revoked(&self, count: u64) {
        counter!("auth_tokens_revoked_total").increment(count);
    }

    /// Record token records found expired on use
    pub fn record_token_expired(&self) {
        counter!("auth_tokens_expired_total").increment(1);
    }

    /// Register baseline auth metrics so Prometheus exports appear before events occur.
    pub fn register_auth_metrics(&self) {
        describe_counter!(
            "auth_authentications_total",
            Unit::Count,
            "Authentication attempts grouped by outcome"
        );
        describe_counter!(
            "auth_requests_total",
            Unit::Count,
            "Requests seen by the bearer filter grouped by outcome"
        );
        describe_counter!("auth_tokens_issued_total", Unit::Count, "JWTs issued by kind");
        describe_counter!(
            "auth_tokens_revoked_total",
            Unit::Count,
            "Token records moved to revoked"
        );
        describe_counter!(
            "auth_tokens_expired_total",
            Unit::Count,
            "Token records moved to expired on use"
        );
        describe_histogram!(
            "http_request_duration_seconds",
            Unit::Seconds,
            "Duration of HTTP requests"
        );

        counter!("auth_tokens_revoked_total").absolute(0);
        counter!("auth_tokens_expired_total").absolute(0);
        counter!("auth_tokens_issued_total", "kind" => "access").absolute(0);
        counter!("auth_tokens_issued_total", "kind" => "refresh").absolute(0);

        for status in AUTHENTICATION_STATUSES {
            counter!("auth_authentications_total", "status" => *status).absolute(0);
        }
        for status in REQUEST_STATUSES {
            counter!("auth_requests_total", "status" => *status).absolute(0);
        }
    }
}

/// Global metrics recorder instance
static METRICS: once_cell::sync::Lazy<Arc<RwLock<Option<MetricsRecorder>>>> =
    once_cell::sync::Lazy::new(|| Arc::new(RwLock::new(None)));

/// Initialize metrics collection and Prometheus exporter
pub async fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    if !config.enable_metrics {
        return Ok(());
    }

    let metrics_addr = match config.metrics_bind_address() {
        Some(addr) => addr,
        None => {
            warn!("Metrics disabled: no bind address configured");
            return Ok(());
        }
    };

    let socket_addr: SocketAddr = metrics_addr.parse().map_err(|e| {
        AuthgateError::config(format!("Invalid metrics bind address '{}': {}", metrics_addr, e))
    })?;

    let builder = PrometheusBuilder::new()
        .with_http_listener(socket_addr)
        .add_global_label("service", &config.service_name);

    builder.install().map_err(|e| {
        AuthgateError::config(format!("Failed to initialize metrics exporter: {}", e))
    })?;

    let recorder = MetricsRecorder::new();
    {
        let mut metrics = METRICS.write().await;
        *metrics = Some(recorder.clone());
    }

    recorder.register_auth_metrics();

    info!(
        metrics_addr = %metrics_addr,
        service_name = %config.service_name,
        "Metrics collection initialized"
    );

    Ok(())
}

/// Get the global metrics recorder
pub async fn get_metrics() -> Option<MetricsRecorder> {
    METRICS.read().await.clone()
}

/// Record an HTTP request using the global metrics recorder
pub async fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    if let Some(metrics) = get_metrics().await {
        metrics.record_http_request(method, path, status, duration);
    }
}

/// Record authentication attempt outcome via the global recorder
pub async fn record_authentication(status: &str) {
    if let Some(metrics) = get_metrics().await {
        metrics.record_authentication(status);
    }
}

/// Record a request filter outcome via the global recorder
pub async fn record_request_authentication(status: &str) {
    if let Some(metrics) = get_metrics().await {
        metrics.record_request_authentication(status);
    }
}

/// Record an issued JWT via the global recorder
pub async fn record_token_issued(kind: &str) {
    if let Some(metrics) = get_metrics().await {
        metrics.record_token_issued(kind);
    }
}

/// Record revoked token records via the global recorder
pub async fn record_tokens_revoked(count: u64) {
    if count == 0 {
        return;
    }
    if let Some(metrics) = get_metrics().await {
        metrics.record_tokens_revoked(count);
    }
}

/// Record a token record found expired via the global recorder
pub async fn record_token_expired() {
    if let Some(metrics) = get_metrics().await {
        metrics.record_token_expired();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let recorder = MetricsRecorder::new();

        recorder.record_http_request("POST", "/api/v1/auth/authenticate", 200, 0.012);
        recorder.record_authentication("success");
        recorder.record_authentication("invalid_credentials");
        recorder.record_request_authentication("authenticated");
        recorder.record_token_issued("access");
        recorder.record_tokens_revoked(3);
        recorder.record_token_expired();
        recorder.register_auth_metrics();
    }

    #[test]
    fn authentication_outcomes_are_counted_once_per_status() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        ::metrics::with_local_recorder(&recorder, || {
            let metrics = MetricsRecorder::new();
            metrics.record_authentication("success");
            metrics.record_authentication("success");
            metrics.record_authentication("invalid_credentials");
        });

        let rendered = handle.render();
        let samples: Vec<&str> = rendered
            .lines()
            .filter(|line| line.starts_with("auth_authentications_total"))
            .collect();

        assert_eq!(samples.len(), 2, "unexpected samples: {samples:?}");
        assert!(samples.iter().all(|line| line.contains("{status=")));
        assert!(samples.contains(&r#"auth_authentications_total{status="success"} 2"#));
        assert!(samples.contains(&r#"auth_authentications_total{status="invalid_credentials"} 1"#));
    }

    #[tokio::test]
    async fn test_init_metrics_disabled() {
        let config = ObservabilityConfig { enable_metrics: false, ..Default::default() };
        assert!(init_metrics(&config).await.is_ok());
    }

    #[tokio::test]
    async fn test_init_metrics_no_port() {
        let config =
            ObservabilityConfig { enable_metrics: true, metrics_port: 0, ..Default::default() };
        assert!(init_metrics(&config).await.is_ok());
    }

    #[tokio::test]
    async fn global_helpers_are_no_ops_without_recorder() {
        record_authentication("success").await;
        record_tokens_revoked(0).await;
        record_token_issued("refresh").await;
    }
}
