//! Shared state handed to every request handler

use crate::config::Config;
use crate::random::RandomSource;
use crate::server::health::HealthChecks;
use crate::server::lifecycle::{ServiceLifecycle, ServiceState};
use crate::server::metrics::SharedMetrics;
use std::sync::Arc;

/// Everything a handler on either listener may touch
///
/// Built once at startup and shared read-only behind an `Arc`; the only
/// mutable part is the lifecycle state, which is atomic.
pub struct ServiceContext {
    pub config: Config,
    pub random: Arc<dyn RandomSource>,
    pub lifecycle: ServiceLifecycle,
    pub metrics: SharedMetrics,
    pub health: HealthChecks,
}

impl ServiceContext {
    /// Create the context and register the `http` readiness check
    pub fn new(config: Config, random: Arc<dyn RandomSource>, metrics: SharedMetrics) -> Self {
        let lifecycle = ServiceLifecycle::new();

        let mut health = HealthChecks::new();
        let http_state = lifecycle.clone();
        health.add_readiness_check("http", move || match http_state.current_state() {
            ServiceState::Running => Ok(()),
            state => Err(format!("HTTP server is {}", state)),
        });

        Self {
            config,
            random,
            lifecycle,
            metrics,
            health,
        }
    }
}
