//! Observability infrastructure for the SleepWise client
//!
//! Provides:
//! - Prometheus metrics (request count and latency per endpoint, local rejections,
//!   discarded dashboard responses)
//! - tracing subscriber setup with optional JSON output

use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Histogram buckets for request latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ClientMetricsInner> = OnceLock::new();

/// Outcome label values for the request counter
pub mod outcome {
    pub const SUCCESS: &str = "success";
    pub const HTTP_ERROR: &str = "http_error";
    pub const TRANSPORT_ERROR: &str = "transport_error";
    pub const MALFORMED: &str = "malformed";
    pub const AUTH_MISSING: &str = "auth_missing";
}

struct ClientMetricsInner {
    requests: IntCounterVec,
    request_latency_seconds: HistogramVec,
    validation_rejections: IntCounter,
    dashboard_refreshes: IntCounter,
    stale_dashboard_responses: IntCounter,
}

impl ClientMetricsInner {
    fn new() -> Self {
        Self {
            requests: register_int_counter_vec!(
                "sleepwise_client_requests_total",
                "API requests issued by the client, by endpoint and outcome",
                &["endpoint", "outcome"]
            )
            .expect("Failed to register requests_total"),

            request_latency_seconds: register_histogram_vec!(
                "sleepwise_client_request_latency_seconds",
                "Round-trip time of API requests",
                &["endpoint"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register request_latency_seconds"),

            validation_rejections: register_int_counter!(
                "sleepwise_client_validation_rejections_total",
                "Submissions rejected locally before reaching the network"
            )
            .expect("Failed to register validation_rejections_total"),

            dashboard_refreshes: register_int_counter!(
                "sleepwise_dashboard_refreshes_total",
                "Dashboard refreshes started"
            )
            .expect("Failed to register dashboard_refreshes_total"),

            stale_dashboard_responses: register_int_counter!(
                "sleepwise_dashboard_stale_responses_total",
                "Dashboard responses discarded because a newer refresh was issued"
            )
            .expect("Failed to register dashboard_stale_responses_total"),
        }
    }
}

/// Client metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct ClientMetrics {
    _private: (),
}

impl Default for ClientMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ClientMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ClientMetrics")
    }
}

impl ClientMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ClientMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ClientMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record one finished request
    pub fn observe_request(&self, endpoint: &str, outcome: &str, duration_secs: f64) {
        let inner = self.inner();
        inner.requests.with_label_values(&[endpoint, outcome]).inc();
        inner
            .request_latency_seconds
            .with_label_values(&[endpoint])
            .observe(duration_secs);
    }

    /// Record a request refused before it was sent
    pub fn record_refused(&self, endpoint: &str, outcome: &str) {
        self.inner()
            .requests
            .with_label_values(&[endpoint, outcome])
            .inc();
    }

    pub fn request_count(&self, endpoint: &str, outcome: &str) -> u64 {
        self.inner()
            .requests
            .with_label_values(&[endpoint, outcome])
            .get()
    }

    pub fn inc_validation_rejections(&self) {
        self.inner().validation_rejections.inc();
    }

    pub fn validation_rejections(&self) -> u64 {
        self.inner().validation_rejections.get()
    }

    pub fn inc_dashboard_refreshes(&self) {
        self.inner().dashboard_refreshes.inc();
    }

    pub fn inc_stale_dashboard_responses(&self) {
        self.inner().stale_dashboard_responses.inc();
    }

    pub fn stale_dashboard_responses(&self) -> u64 {
        self.inner().stale_dashboard_responses.get()
    }

    /// Render every registered metric in the Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Initialize tracing
///
/// `RUST_LOG` overrides `default_level`. Safe to call more than once; later
/// calls are ignored.
pub fn init_logging(default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_handles_share_state() {
        let a = ClientMetrics::new();
        let b = a.clone();

        let before = b.request_count("observability-test", outcome::SUCCESS);
        a.observe_request("observability-test", outcome::SUCCESS, 0.02);
        assert_eq!(
            b.request_count("observability-test", outcome::SUCCESS),
            before + 1
        );
    }

    #[test]
    fn test_render_contains_registered_metrics() {
        let metrics = ClientMetrics::new();
        metrics.observe_request("render-test", outcome::HTTP_ERROR, 0.1);
        let text = metrics.render().unwrap();
        assert!(text.contains("sleepwise_client_requests_total"));
        assert!(text.contains("render-test"));
    }

    #[test]
    fn test_init_logging_twice_does_not_panic() {
        init_logging("debug", false);
        init_logging("info", true);
    }
}
