//! Health check registry and probe endpoints
//!
//! - `/live` - Liveness: is the process alive?
//! - `/ready` - Readiness: should the service receive traffic?
//!
//! Both endpoints respond with a JSON object. On failure it maps each failing
//! check to its error message; with `?full=1` passing checks are listed as
//! `"OK"` too.

use crate::server::context::ServiceContext;
use crate::server::metrics::SharedMetrics;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// A named health check; `Err` carries the failure message
pub type Check = Box<dyn Fn() -> Result<(), String> + Send + Sync>;

/// Registry of liveness and readiness checks
///
/// Checks are registered during startup, before the registry is shared.
#[derive(Default)]
pub struct HealthChecks {
    liveness: Vec<(String, Check)>,
    readiness: Vec<(String, Check)>,
}

/// Outcome of evaluating a set of checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub healthy: bool,
    pub results: BTreeMap<String, Result<(), String>>,
}

impl CheckReport {
    /// JSON body for the probe response
    fn body(&self, full: bool) -> BTreeMap<String, String> {
        self.results
            .iter()
            .filter_map(|(name, result)| match result {
                Ok(()) if full => Some((name.clone(), "OK".to_string())),
                Ok(()) => None,
                Err(msg) => Some((name.clone(), msg.clone())),
            })
            .collect()
    }
}

impl HealthChecks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_liveness_check<F>(&mut self, name: impl Into<String>, check: F)
    where
        F: Fn() -> Result<(), String> + Send + Sync + 'static,
    {
        self.liveness.push((name.into(), Box::new(check)));
    }

    /// Register a readiness check
    pub fn add_readiness_check<F>(&mut self, name: impl Into<String>, check: F)
    where
        F: Fn() -> Result<(), String> + Send + Sync + 'static,
    {
        self.readiness.push((name.into(), Box::new(check)));
    }

    pub fn check_liveness(&self, metrics: &SharedMetrics) -> CheckReport {
        evaluate(&self.liveness, metrics)
    }

    /// Evaluate readiness; liveness checks count towards readiness as well
    pub fn check_readiness(&self, metrics: &SharedMetrics) -> CheckReport {
        let mut report = evaluate(&self.liveness, metrics);
        let readiness = evaluate(&self.readiness, metrics);
        report.healthy &= readiness.healthy;
        report.results.extend(readiness.results);
        report
    }
}

fn evaluate(checks: &[(String, Check)], metrics: &SharedMetrics) -> CheckReport {
    let mut results = BTreeMap::new();
    let mut healthy = true;

    for (name, check) in checks {
        let result = check();
        let passed = result.is_ok();
        metrics.record_check(name, passed);
        if let Err(ref msg) = result {
            debug!(check = %name, error = %msg, "Health check failed");
            healthy = false;
        }
        results.insert(name.clone(), result);
    }

    CheckReport { healthy, results }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProbeParams {
    full: Option<String>,
}

impl ProbeParams {
    fn full(&self) -> bool {
        self.full.as_deref() == Some("1")
    }
}

fn respond(report: CheckReport, full: bool) -> (StatusCode, Json<BTreeMap<String, String>>) {
    let status = if report.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report.body(full)))
}

/// Liveness probe handler
///
/// No liveness checks are registered, so this returns 200 while the
/// process can answer at all.
pub async fn live(
    State(ctx): State<Arc<ServiceContext>>,
    Query(params): Query<ProbeParams>,
) -> (StatusCode, Json<BTreeMap<String, String>>) {
    respond(ctx.health.check_liveness(&ctx.metrics), params.full())
}

/// Readiness probe handler
///
/// Returns 200 if every check passes, 503 Service Unavailable otherwise.
pub async fn ready(
    State(ctx): State<Arc<ServiceContext>>,
    Query(params): Query<ProbeParams>,
) -> (StatusCode, Json<BTreeMap<String, String>>) {
    respond(ctx.health.check_readiness(&ctx.metrics), params.full())
}
