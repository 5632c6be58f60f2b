//! Prometheus metrics registry
//!
//! All series share the `auth` prefix. The registry is owned by the
//! application state so every router instance exposes its own counters.
//!
//! Author: hephaex@gmail.com

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Request latency buckets in seconds
const DURATION_BUCKETS: &[f64] = &[0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Service metrics
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    /// Requests by method, endpoint and status
    pub request_count: IntCounterVec,
    /// Request latency by method and endpoint
    pub request_duration: HistogramVec,
    /// 1 when the readiness probe last reported ready
    pub ready_probe_status: IntGauge,
    /// Login attempts by outcome
    pub auth_attempts: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("auth".to_string()), None)?;

        let request_count = IntCounterVec::new(
            Opts::new("request_count", "Total HTTP requests"),
            &["method", "endpoint", "status"],
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new("request_duration", "HTTP request latency in seconds")
                .buckets(DURATION_BUCKETS.to_vec()),
            &["method", "endpoint"],
        )?;
        let ready_probe_status =
            IntGauge::new("ready_probe_status", "Readiness probe result (1 ready, 0 not ready)")?;
        let auth_attempts = IntCounterVec::new(
            Opts::new("auth_attempts", "Login attempts by outcome"),
            &["outcome"],
        )?;

        registry.register(Box::new(request_count.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(ready_probe_status.clone()))?;
        registry.register(Box::new(auth_attempts.clone()))?;

        Ok(Self {
            registry,
            request_count,
            request_duration,
            ready_probe_status,
            auth_attempts,
        })
    }

    /// Record one finished request
    pub fn observe_request(&self, method: &str, endpoint: &str, status: u16, elapsed_secs: f64) {
        self.request_count
            .with_label_values(&[method, endpoint, &status.to_string()])
            .inc();
        self.request_duration
            .with_label_values(&[method, endpoint])
            .observe(elapsed_secs);
    }

    pub fn record_auth_attempt(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.auth_attempts.with_label_values(&[outcome]).inc();
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready_probe_status.set(i64::from(ready));
    }

    /// Render all series in the Prometheus text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
