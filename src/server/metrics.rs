//! Prometheus metrics for the color service
//!
//! Metrics live in a private registry rather than the process-global one so
//! tests can create as many as they like.

use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

pub type SharedMetrics = Arc<ServiceMetrics>;

const NAMESPACE: &str = "color";

#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    healthcheck_status: IntGaugeVec,
}

impl ServiceMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("requests_total", "Color requests handled, by HTTP status code")
                .namespace(NAMESPACE),
            &["code"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let healthcheck_status = IntGaugeVec::new(
            Opts::new(
                "status",
                "Current health check status (0 indicates success, 1 indicates failure)",
            )
            .namespace(NAMESPACE)
            .subsystem("healthcheck"),
            &["check"],
        )?;
        registry.register(Box::new(healthcheck_status.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            healthcheck_status,
        })
    }

    /// Count a `/next` response with the given status code
    pub fn record_request(&self, code: u16) {
        self.requests_total
            .with_label_values(&[code.to_string().as_str()])
            .inc();
    }

    /// Record the latest outcome of a named health check
    pub fn record_check(&self, check: &str, healthy: bool) {
        self.healthcheck_status
            .with_label_values(&[check])
            .set(if healthy { 0 } else { 1 });
    }

    /// Render all metrics in Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Create the shared metrics registry
pub fn create_metrics() -> Result<SharedMetrics, prometheus::Error> {
    Ok(Arc::new(ServiceMetrics::new()?))
}
